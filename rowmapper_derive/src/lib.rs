use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Type, parse_macro_input, spanned::Spanned};

/// Derives `rowmapper::Entity` and `rowmapper::FieldCodec`.
///
/// Struct attribute: `#[entity(table = "...")]`, omitted for types only used
/// as nested elements.
///
/// Field attribute: `#[column(name = "...", primary_key, inner_type = Ty, skip)]`.
/// `inner_type` is the element type of a `Vec` field and must name the same
/// type; skipped fields are not persistent and keep their default value on read.
#[proc_macro_derive(Entity, attributes(entity, column))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_entity(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct EntityOptions {
    table_name: Option<String>,
}

#[derive(Default)]
struct ColumnOptions {
    column_name: Option<String>,
    primary_key: bool,
    inner_type: Option<Type>,
    skip: bool,
}

struct PersistentFieldDef {
    ident: Ident,
    name: String,
    ty: Type,
    options: ColumnOptions,
}

fn expand_entity(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.generics,
            "Entity does not support generic structs",
        ));
    }

    let entity_options = parse_entity_options(&input.attrs)?;

    let Data::Struct(data_struct) = input.data else {
        return Err(syn::Error::new(
            struct_name.span(),
            "Entity can only be derived for structs",
        ));
    };
    let Fields::Named(named_fields) = data_struct.fields else {
        return Err(syn::Error::new(
            struct_name.span(),
            "Entity requires named fields",
        ));
    };

    let mut fields = Vec::<PersistentFieldDef>::new();
    for field in named_fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "Entity requires named fields"))?;
        let options = parse_column_options(&field.attrs)?;
        if options.skip {
            continue;
        }
        let name = ident.to_string().trim_start_matches("r#").to_string();
        fields.push(PersistentFieldDef {
            ident,
            name,
            ty: field.ty,
            options,
        });
    }

    let table_call = match entity_options.table_name {
        Some(table_name) => quote! { .table(#table_name) },
        None => quote! {},
    };

    let field_exprs = fields.iter().map(persistent_field_expr);

    let read_arms = fields.iter().map(|field| {
        let ident = &field.ident;
        let name = &field.name;
        quote! {
            #name => ::core::option::Option::Some(::rowmapper::FieldCodec::to_field_value(&self.#ident)),
        }
    });

    let write_arms = fields.iter().map(|field| {
        let ident = &field.ident;
        let name = &field.name;
        let ty = &field.ty;
        quote! {
            #name => {
                self.#ident = <#ty as ::rowmapper::FieldCodec>::from_field_value(value)?;
                ::core::result::Result::Ok(())
            }
        }
    });

    Ok(quote! {
        impl ::rowmapper::Entity for #struct_name {
            fn entity_metadata() -> ::rowmapper::EntityMetadata {
                ::rowmapper::EntityMetadata::builder(stringify!(#struct_name))
                    #table_call
                    #( .field(#field_exprs) )*
                    .build()
            }

            fn read_field(&self, field: &str) -> ::core::option::Option<::rowmapper::FieldValue> {
                match field {
                    #( #read_arms )*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unused_variables)]
            fn write_field(
                &mut self,
                field: &str,
                value: ::rowmapper::FieldValue,
            ) -> ::rowmapper::Result<()> {
                match field {
                    #( #write_arms )*
                    _ => ::core::result::Result::Err(
                        ::rowmapper::MappingError::UnknownField {
                            entity: stringify!(#struct_name).to_string(),
                            field: field.to_string(),
                        }
                        .into(),
                    ),
                }
            }
        }

        impl ::rowmapper::FieldCodec for #struct_name {
            fn declared_type() -> ::rowmapper::DeclaredType {
                ::rowmapper::DeclaredType::Entity(::rowmapper::EntityDescriptor::of::<Self>())
            }

            fn to_field_value(&self) -> ::rowmapper::FieldValue {
                ::rowmapper::FieldValue::EntityRef(stringify!(#struct_name))
            }

            fn from_field_value(
                value: ::rowmapper::FieldValue,
            ) -> ::core::result::Result<Self, ::rowmapper::ConversionError> {
                ::rowmapper::entity_from_field_value::<Self>(value)
            }
        }
    })
}

fn persistent_field_expr(field: &PersistentFieldDef) -> TokenStream2 {
    let ty = &field.ty;
    let name = &field.name;
    let mut expr = quote! { ::rowmapper::PersistentField::of::<#ty>(#name) };
    if let Some(column_name) = &field.options.column_name {
        expr = quote! { #expr.column(#column_name) };
    }
    if field.options.primary_key {
        expr = quote! { #expr.primary_key() };
    }
    if let Some(inner) = &field.options.inner_type {
        expr = quote! { #expr.inner_type(::rowmapper::InnerType::of::<#inner>()) };
    }
    expr
}

fn parse_entity_options(attrs: &[syn::Attribute]) -> syn::Result<EntityOptions> {
    let mut options = EntityOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.table_name = Some(lit.value());
                return Ok(());
            }

            Err(meta.error("Unsupported entity attribute. Supported: table = \"...\""))
        })?;
    }

    Ok(options)
}

fn parse_column_options(attrs: &[syn::Attribute]) -> syn::Result<ColumnOptions> {
    let mut options = ColumnOptions::default();
    let mut seen = false;

    for attr in attrs {
        if !attr.path().is_ident("column") {
            continue;
        }

        if seen {
            return Err(syn::Error::new(
                attr.span(),
                "Duplicate #[column(...)] attribute on field",
            ));
        }
        seen = true;

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("primary_key") {
                options.primary_key = true;
                return Ok(());
            }

            if meta.path.is_ident("skip") {
                options.skip = true;
                return Ok(());
            }

            if meta.path.is_ident("name") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.column_name = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("inner_type") {
                let value = meta.value()?;
                options.inner_type = Some(value.parse()?);
                return Ok(());
            }

            Err(meta.error(
                "Unsupported #[column(...)] option. Supported: name = \"...\", primary_key, inner_type = Type, skip",
            ))
        })?;

        if options.skip && (options.primary_key || options.column_name.is_some()) {
            return Err(syn::Error::new(
                attr.span(),
                "#[column(skip)] cannot be combined with other column options",
            ));
        }
    }

    Ok(options)
}
