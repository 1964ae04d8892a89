//! Derive macros for the Tischplan seating engine
//!
//! # Available Macros
//!
//! - `#[derive(Action)]` - Classifies action enum variants as commands or events
//!
//! # Example
//!
//! ```ignore
//! use tischplan_macros::Action;
//!
//! #[derive(Action, Clone, Debug)]
//! enum PlanAction {
//!     #[command]
//!     MarkSold { reservation_id: String },
//!
//!     #[event]
//!     SnapshotPublished { revision: u64 },
//! }
//!
//! assert!(PlanAction::MarkSold { reservation_id: "r1".into() }.is_command());
//! assert_eq!(PlanAction::SnapshotPublished { revision: 1 }.event_type(), "SnapshotPublished.v1");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Variant};

/// Derive macro for Action enums
///
/// Generates:
/// - `is_command()` - true for variants marked `#[command]`
/// - `is_event()` - true for variants marked `#[event]`
/// - `event_type()` - versioned type name (`"<Variant>.v1"`) for events, `"unknown"` otherwise
///
/// Unmarked variants are neither commands nor events.
///
/// # Errors
///
/// Emits a compile error when applied to a non-enum type or when a variant
/// carries both `#[command]` and `#[event]`.
#[proc_macro_derive(Action, attributes(command, event))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(&input, "#[derive(Action)] can only be used on enums")
            .to_compile_error()
            .into();
    };

    let mut is_command_arms = Vec::new();
    let mut is_event_arms = Vec::new();
    let mut event_type_arms = Vec::new();

    for variant in &data_enum.variants {
        let is_command = has_attribute(&variant.attrs, "command");
        let is_event = has_attribute(&variant.attrs, "event");

        if is_command && is_event {
            return syn::Error::new_spanned(
                variant,
                "Variant cannot be both #[command] and #[event]",
            )
            .to_compile_error()
            .into();
        }

        let pattern = variant_pattern(variant);
        if is_command {
            is_command_arms.push(quote! { #pattern => true, });
        }
        if is_event {
            let type_name = format!("{}.v1", variant.ident);
            is_event_arms.push(quote! { #pattern => true, });
            event_type_arms.push(quote! { #pattern => #type_name, });
        }
    }

    let expanded = quote! {
        impl #name {
            /// Returns true if this action is a command
            #[must_use]
            #[allow(unreachable_patterns)]
            pub const fn is_command(&self) -> bool {
                match self {
                    #(#is_command_arms)*
                    _ => false,
                }
            }

            /// Returns true if this action is an event
            #[must_use]
            #[allow(unreachable_patterns)]
            pub const fn is_event(&self) -> bool {
                match self {
                    #(#is_event_arms)*
                    _ => false,
                }
            }

            /// Returns the versioned event type name
            ///
            /// Commands and unmarked variants return "unknown".
            #[must_use]
            #[allow(unreachable_patterns)]
            pub const fn event_type(&self) -> &'static str {
                match self {
                    #(#event_type_arms)*
                    _ => "unknown",
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// Wildcard match pattern for a variant regardless of its field shape
fn variant_pattern(variant: &Variant) -> TokenStream2 {
    let ident = &variant.ident;
    match &variant.fields {
        Fields::Named(_) => quote! { Self::#ident { .. } },
        Fields::Unnamed(_) => quote! { Self::#ident(..) },
        Fields::Unit => quote! { Self::#ident },
    }
}

fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}
