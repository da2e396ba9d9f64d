use proc_macro::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{Data, DeriveInput, Fields, LitByteStr, LitStr, Token, parse_macro_input};

#[proc_macro_derive(Yson, attributes(yson))]
pub fn derive_yson(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    derive_yson_expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Hook {
    Text,
    Binary,
}

fn container_hook(attrs: &[syn::Attribute]) -> syn::Result<Option<Hook>> {
    let mut hook = None;
    for attr in attrs {
        if !attr.path().is_ident("yson") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("text") {
                hook = Some(Hook::Text);
                Ok(())
            } else if meta.path.is_ident("binary") {
                hook = Some(Hook::Binary);
                Ok(())
            } else {
                Err(meta.error("expected `text` or `binary`"))
            }
        })?;
    }
    Ok(hook)
}

fn derive_yson_expand(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Generic types are not supported",
        ));
    }

    if let Some(hook) = container_hook(&input.attrs)? {
        return Ok(impl_hook(name, hook));
    }

    match &input.data {
        Data::Struct(data_struct) => impl_yson_struct(name, data_struct),
        Data::Enum(data_enum) => impl_yson_enum(name, data_enum),
        Data::Union(_) => Err(syn::Error::new_spanned(
            name,
            "Union types are not supported",
        )),
    }
}

enum FieldArg {
    Tag(LitStr),
    Embed,
}

impl Parse for FieldArg {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(LitStr) {
            return Ok(FieldArg::Tag(input.parse()?));
        }
        let ident: syn::Ident = input.parse()?;
        if ident == "embed" {
            Ok(FieldArg::Embed)
        } else {
            Err(syn::Error::new_spanned(
                ident,
                "expected a tag string or `embed`",
            ))
        }
    }
}

struct FieldAttrs {
    tag: Option<LitStr>,
    embed: bool,
}

impl FieldAttrs {
    fn parse(attrs: &[syn::Attribute]) -> syn::Result<Self> {
        let mut result = FieldAttrs {
            tag: None,
            embed: false,
        };
        for attr in attrs {
            if !attr.path().is_ident("yson") {
                continue;
            }
            let args =
                attr.parse_args_with(Punctuated::<FieldArg, Token![,]>::parse_terminated)?;
            for arg in args {
                match arg {
                    FieldArg::Tag(tag) => result.tag = Some(tag),
                    FieldArg::Embed => result.embed = true,
                }
            }
        }
        Ok(result)
    }

    fn skip(&self) -> bool {
        self.tag.as_ref().is_some_and(|t| t.value() == "-")
    }

    /// Whether the tag gives the field an explicit wire name.
    fn named(&self) -> bool {
        self.tag.as_ref().is_some_and(|t| {
            let tag = t.value();
            tag != "-" && tag.split(',').next().is_some_and(|n| !n.is_empty())
        })
    }
}

fn impl_yson_struct(
    name: &syn::Ident,
    data: &syn::DataStruct,
) -> syn::Result<proc_macro2::TokenStream> {
    let fields = match &data.fields {
        Fields::Named(fields) => &fields.named,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Only named fields are supported",
            ));
        }
    };

    let name_str = name.to_string();
    let mut field_infos = Vec::new();
    let mut decode_arms = Vec::new();
    let mut encode_arms = Vec::new();
    let mut empty_arms = Vec::new();
    let mut included = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let field_ty = &field.ty;
        let attrs = FieldAttrs::parse(&field.attrs)?;

        let ident_str = field_name.to_string();
        let tag = match &attrs.tag {
            Some(tag) => quote! { ::core::option::Option::Some(#tag) },
            None => quote! { ::core::option::Option::None },
        };
        let embedded = if attrs.embed {
            quote! {
                ::core::option::Option::Some(
                    <<#field_ty as ::yson::Embed>::Target as ::yson::Aggregate>::FIELDS
                )
            }
        } else {
            quote! { ::core::option::Option::None }
        };
        field_infos.push(quote! {
            ::yson::FieldInfo {
                ident: #ident_str,
                tag: #tag,
                embedded: #embedded,
            }
        });

        if attrs.skip() {
            continue;
        }
        included.push(field_name.clone());

        if !attrs.embed || attrs.named() {
            decode_arms.push(quote! {
                [#index] => ::yson::Decode::decode(&mut self.#field_name, r),
            });
            encode_arms.push(quote! {
                [#index] => ::yson::Encode::encode(&self.#field_name, w),
            });
            empty_arms.push(quote! {
                [#index] => ::core::option::Option::Some(
                    ::yson::Encode::is_empty_value(&self.#field_name)
                ),
            });
        }
        if attrs.embed {
            decode_arms.push(quote! {
                [#index, rest @ ..] => ::yson::Aggregate::decode_field(
                    ::yson::Embed::embedded_mut(&mut self.#field_name),
                    rest,
                    r,
                ),
            });
            encode_arms.push(quote! {
                [#index, rest @ ..] => match ::yson::Embed::embedded(&self.#field_name) {
                    ::core::option::Option::Some(inner) => {
                        ::yson::Aggregate::encode_field(inner, rest, w)
                    }
                    ::core::option::Option::None => w.entity(),
                },
            });
            empty_arms.push(quote! {
                [#index, rest @ ..] => ::yson::Embed::embedded(&self.#field_name)
                    .and_then(|inner| ::yson::Aggregate::field_is_empty(inner, rest)),
            });
        }
    }

    let expanded = quote! {
        impl ::yson::Aggregate for #name {
            const NAME: &'static str = #name_str;
            const FIELDS: &'static [::yson::FieldInfo] = &[#(#field_infos),*];

            #[allow(unused_variables)]
            fn decode_field(
                &mut self,
                path: &[usize],
                r: &mut ::yson::Reader<'_>,
            ) -> ::yson::DecodeResult<()> {
                match path {
                    #(#decode_arms)*
                    _ => ::core::result::Result::Err(::yson::DecodeError::new(
                        ::yson::DecodeErrorKind::UnsupportedType(
                            ::std::format!("{} has no field at {:?}", #name_str, path)
                        )
                    )),
                }
            }

            #[allow(unused_variables)]
            fn encode_field(
                &self,
                path: &[usize],
                w: &mut ::yson::Writer<'_>,
            ) -> ::yson::EncodeResult<()> {
                match path {
                    #(#encode_arms)*
                    _ => ::core::result::Result::Err(::yson::EncodeError::new(
                        ::yson::EncodeErrorKind::UnsupportedType(
                            ::std::format!("{} has no field at {:?}", #name_str, path)
                        )
                    )),
                }
            }

            fn field_is_empty(&self, path: &[usize]) -> ::core::option::Option<bool> {
                match path {
                    #(#empty_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl ::yson::Embed for #name {
            type Target = Self;

            fn embedded(&self) -> ::core::option::Option<&Self> {
                ::core::option::Option::Some(self)
            }

            fn embedded_mut(&mut self) -> &mut Self {
                self
            }
        }

        impl ::yson::Encode for #name {
            fn encode(&self, w: &mut ::yson::Writer<'_>) -> ::yson::EncodeResult<()> {
                ::yson::encode_aggregate(self, w)
            }

            fn is_empty_value(&self) -> bool {
                true #(&& ::yson::Encode::is_empty_value(&self.#included))*
            }
        }

        impl ::yson::Decode for #name {
            fn decode(&mut self, r: &mut ::yson::Reader<'_>) -> ::yson::DecodeResult<()> {
                ::yson::decode_aggregate(self, r)
            }
        }
    };

    Ok(expanded)
}

fn impl_yson_enum(
    name: &syn::Ident,
    data: &syn::DataEnum,
) -> syn::Result<proc_macro2::TokenStream> {
    let mut variant_info = Vec::new();

    for variant in &data.variants {
        let variant_name = &variant.ident;

        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant_name,
                "Only unit variants are supported",
            ));
        }

        let mut wire_name = variant_name.to_string();
        for attr in &variant.attrs {
            if attr.path().is_ident("yson") {
                let tag: LitStr = attr.parse_args()?;
                wire_name = tag.value();
            }
        }

        for (_, existing) in &variant_info {
            if *existing == wire_name {
                return Err(syn::Error::new_spanned(
                    variant_name,
                    format!("Duplicate variant name: {wire_name}"),
                ));
            }
        }
        variant_info.push((variant_name.clone(), wire_name));
    }

    let to_name = variant_info.iter().map(|(variant_name, wire_name)| {
        let bytes = LitByteStr::new(wire_name.as_bytes(), variant_name.span());
        quote! { Self::#variant_name => #bytes }
    });
    let from_name = variant_info.iter().map(|(variant_name, wire_name)| {
        let bytes = LitByteStr::new(wire_name.as_bytes(), variant_name.span());
        quote! { #bytes => ::core::result::Result::Ok(Self::#variant_name) }
    });

    let expanded = quote! {
        impl ::yson::MapKey for #name {
            fn to_key(&self) -> ::yson::EncodeResult<::std::borrow::Cow<'_, [u8]>> {
                let name: &'static [u8] = match self {
                    #(#to_name,)*
                };
                ::core::result::Result::Ok(::std::borrow::Cow::Borrowed(name))
            }

            fn from_key(key: &[u8]) -> ::yson::DecodeResult<Self> {
                match key {
                    #(#from_name,)*
                    other => ::core::result::Result::Err(::yson::DecodeError::new(
                        ::yson::DecodeErrorKind::UnknownVariant(
                            ::std::string::String::from_utf8_lossy(other).into_owned()
                        )
                    )),
                }
            }
        }

        impl ::yson::Encode for #name {
            fn encode(&self, w: &mut ::yson::Writer<'_>) -> ::yson::EncodeResult<()> {
                w.string(::yson::MapKey::to_key(self)?)
            }
        }

        impl ::yson::Decode for #name {
            fn decode(&mut self, r: &mut ::yson::Reader<'_>) -> ::yson::DecodeResult<()> {
                match r.next_value()? {
                    ::yson::Event::Literal(::yson::LiteralType::Entity) => {}
                    ::yson::Event::Literal(::yson::LiteralType::String) => {
                        *self = <Self as ::yson::MapKey>::from_key(r.bytes()?)?;
                    }
                    other => return ::core::result::Result::Err(r.unexpected("string", other)),
                }
                ::core::result::Result::Ok(())
            }
        }
    };

    Ok(expanded)
}

/// Types encoded as a single string through their own conversions.
fn impl_hook(name: &syn::Ident, hook: Hook) -> proc_macro2::TokenStream {
    let (encode, parse, key) = match hook {
        Hook::Text => (
            quote! { w.string(::std::string::ToString::to_string(self)) },
            quote! {
                <Self as ::std::str::FromStr>::from_str(r.str()?)
                    .map_err(::yson::DecodeError::custom)?
            },
            quote! {
                fn to_key(&self) -> ::yson::EncodeResult<::std::borrow::Cow<'_, [u8]>> {
                    ::core::result::Result::Ok(::std::borrow::Cow::Owned(
                        ::std::string::ToString::to_string(self).into_bytes()
                    ))
                }

                fn from_key(key: &[u8]) -> ::yson::DecodeResult<Self> {
                    let key = ::std::str::from_utf8(key).map_err(|_| {
                        ::yson::DecodeError::new(::yson::DecodeErrorKind::InvalidUtf8)
                    })?;
                    <Self as ::std::str::FromStr>::from_str(key)
                        .map_err(::yson::DecodeError::custom)
                }
            },
        ),
        Hook::Binary => (
            quote! { w.string(<Self as ::core::convert::AsRef<[u8]>>::as_ref(self)) },
            quote! {
                <Self as ::core::convert::TryFrom<&[u8]>>::try_from(r.bytes()?)
                    .map_err(::yson::DecodeError::custom)?
            },
            quote! {
                fn to_key(&self) -> ::yson::EncodeResult<::std::borrow::Cow<'_, [u8]>> {
                    ::core::result::Result::Ok(::std::borrow::Cow::Borrowed(
                        <Self as ::core::convert::AsRef<[u8]>>::as_ref(self)
                    ))
                }

                fn from_key(key: &[u8]) -> ::yson::DecodeResult<Self> {
                    <Self as ::core::convert::TryFrom<&[u8]>>::try_from(key)
                        .map_err(::yson::DecodeError::custom)
                }
            },
        ),
    };

    quote! {
        impl ::yson::Encode for #name {
            fn encode(&self, w: &mut ::yson::Writer<'_>) -> ::yson::EncodeResult<()> {
                #encode
            }
        }

        impl ::yson::Decode for #name {
            fn decode(&mut self, r: &mut ::yson::Reader<'_>) -> ::yson::DecodeResult<()> {
                match r.next_value()? {
                    ::yson::Event::Literal(::yson::LiteralType::Entity) => {}
                    ::yson::Event::Literal(::yson::LiteralType::String) => {
                        *self = #parse;
                    }
                    other => return ::core::result::Result::Err(r.unexpected("string", other)),
                }
                ::core::result::Result::Ok(())
            }
        }

        impl ::yson::MapKey for #name {
            #key
        }
    }
}
