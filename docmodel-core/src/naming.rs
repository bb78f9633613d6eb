//! Case conversion helpers used to derive collection names from class names.

/// Converts a `PascalCase` name to `snake_case`.
///
/// The first character is lowercased and every later uppercase character becomes an
/// underscore followed by its lowercase form, so acronyms split per letter
/// (`"HTTPLog"` becomes `"h_t_t_p_log"`).
pub fn pascal_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);

    for (i, c) in name.chars().enumerate() {
        if i == 0 {
            out.extend(c.to_lowercase());
        } else if c.is_uppercase() {
            out.push('_');
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

/// Converts a `snake_case` name to `PascalCase`.
///
/// Each underscore separated word gets an uppercase first letter and a lowercase rest.
pub fn snake_to_pascal(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Default collection name for a document class: `snake_case(name) + "s"`.
pub fn default_collection_name(class_name: &str) -> String {
    let mut name = pascal_to_snake(class_name);
    name.push('s');
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pascal_to_snake_cases() {
        assert_eq!(pascal_to_snake("MyPascalString"), "my_pascal_string");
        assert_eq!(pascal_to_snake("User"), "user");
        assert_eq!(pascal_to_snake("user"), "user");
        assert_eq!(pascal_to_snake("HTTPLog"), "h_t_t_p_log");
        assert_eq!(pascal_to_snake(""), "");
    }

    #[test]
    fn snake_to_pascal_cases() {
        assert_eq!(snake_to_pascal("my_snake_string"), "MySnakeString");
        assert_eq!(snake_to_pascal("mIxEd_case"), "MixedCase");
        assert_eq!(snake_to_pascal("__x"), "X");
    }

    #[test]
    fn collection_names() {
        assert_eq!(default_collection_name("User"), "users");
        assert_eq!(default_collection_name("BlogPost"), "blog_posts");
    }
}
