//! Procedural macros for the docmodel project.
//!
//! `#[derive(Model)]` gives a unit or field-less marker type a process-wide
//! `DocumentClass`, created on first use:
//!
//! ```ignore
//! use docmodel::Model;
//!
//! #[derive(Model)]
//! struct BlogPost;            // collection "blog_posts"
//!
//! #[derive(Model)]
//! #[model(collection = "people", name = "Person")]
//! struct PersonModel;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_macros;

use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, LitStr, parse_macro_input};

#[proc_macro_derive(Model, attributes(model))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_model(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_model(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Model cannot be derived for generic types",
        ));
    }

    let ident = &input.ident;
    let mut name = ident.to_string();
    let mut collection: Option<String> = None;

    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("model")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                collection = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else if meta.path.is_ident("name") {
                name = meta.value()?.parse::<LitStr>()?.value();
                Ok(())
            } else {
                Err(meta.error("expected `collection` or `name`"))
            }
        })?;
    }

    let collection = collection.map(|collection| quote! { .collection(#collection) });

    Ok(quote! {
        impl ::docmodel::Model for #ident {
            fn class() -> &'static ::docmodel::DocumentClass {
                static CLASS: ::std::sync::OnceLock<::docmodel::DocumentClass> = ::std::sync::OnceLock::new();

                CLASS.get_or_init(|| {
                    ::docmodel::DocumentClass::builder(#name)
                        #collection
                        .build()
                })
            }
        }
    })
}
