//! Procedural macros for tool definitions.
//!
//! `#[tool]` keeps the annotated function untouched and emits a companion
//! `<name>_tool()` constructor that returns a `bot_tools::ToolFunction`
//! carrying the function's parameter shapes, declared defaults, documentation
//! and an invocation wrapper decoding each argument with serde.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{Attribute, Expr, FnArg, Ident, ItemFn, LitStr, Pat, Type, parse_macro_input};

/// Exposes a function or `async fn` as a tool.
///
/// Options:
///
/// - `context`: the first parameter receives the caller context and is not
///   shown to the model. The constructor returns `ToolFunction<T>` where `T`
///   is that parameter's type; otherwise it returns `ToolFunction<()>`.
/// - `name = "..."`: overrides the callable name.
/// - `default(param = expr, ...)`: declared defaults, converted with
///   `serde_json::json!`.
///
/// ```rust,ignore
/// use bot_tools::tool;
///
/// /// Searches the catalogue.
/// #[tool(default(limit = 10))]
/// async fn search(query: String, limit: u32, cursor: Option<String>) -> String {
///     format!("{query}:{limit}:{}", cursor.unwrap_or_default())
/// }
///
/// let function = search_tool();
/// assert_eq!(function.name(), "search");
/// assert_eq!(function.params().len(), 3);
/// ```
#[proc_macro_attribute]
pub fn tool(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut options = ToolOptions::default();
    let parser = syn::meta::parser(|meta| options.parse(&meta));
    parse_macro_input!(attr with parser);

    let function = parse_macro_input!(item as ItemFn);
    match expand(&options, &function) {
        Ok(companion) => quote! {
            #function
            #companion
        }
        .into(),
        Err(err) => {
            let err = err.to_compile_error();
            quote! {
                #function
                #err
            }
            .into()
        }
    }
}

#[derive(Default)]
struct ToolOptions {
    context: bool,
    name: Option<LitStr>,
    defaults: Vec<(Ident, Expr)>,
}

impl ToolOptions {
    fn parse(&mut self, meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<()> {
        if meta.path.is_ident("context") {
            self.context = true;
            Ok(())
        } else if meta.path.is_ident("name") {
            self.name = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("default") {
            meta.parse_nested_meta(|inner| {
                let ident = inner
                    .path
                    .get_ident()
                    .cloned()
                    .ok_or_else(|| inner.error("expected a parameter name"))?;
                let value: Expr = inner.value()?.parse()?;
                self.defaults.push((ident, value));
                Ok(())
            })
        } else {
            Err(meta.error("unsupported tool option, expected `context`, `name` or `default`"))
        }
    }
}

struct Param {
    ident: Ident,
    ty: Type,
}

fn expand(options: &ToolOptions, function: &ItemFn) -> syn::Result<TokenStream2> {
    let sig = &function.sig;
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new(
            sig.generics.span(),
            "tool functions cannot be generic",
        ));
    }

    let mut params = Vec::with_capacity(sig.inputs.len());
    for input in &sig.inputs {
        match input {
            FnArg::Receiver(receiver) => {
                return Err(syn::Error::new(
                    receiver.span(),
                    "tool functions must be free functions",
                ));
            }
            FnArg::Typed(typed) => {
                let Pat::Ident(pat) = typed.pat.as_ref() else {
                    return Err(syn::Error::new(
                        typed.pat.span(),
                        "tool parameters must be plain identifiers",
                    ));
                };
                if let Type::Reference(reference) = typed.ty.as_ref() {
                    return Err(syn::Error::new(
                        reference.span(),
                        "tool parameters must be owned types",
                    ));
                }
                params.push(Param {
                    ident: pat.ident.clone(),
                    ty: (*typed.ty).clone(),
                });
            }
        }
    }

    let context = if options.context {
        if params.is_empty() {
            return Err(syn::Error::new(
                sig.span(),
                "`context` requires the context as the first parameter",
            ));
        }
        Some(params.remove(0))
    } else {
        None
    };

    for (ident, _) in &options.defaults {
        if !params.iter().any(|param| param.ident == *ident) {
            return Err(syn::Error::new(
                ident.span(),
                format!("`{ident}` is not a parameter of this tool"),
            ));
        }
    }

    let fn_ident = &sig.ident;
    let vis = &function.vis;
    let constructor = format_ident!("{}_tool", fn_ident);
    let tool_name = options
        .name
        .as_ref()
        .map_or_else(|| param_name(fn_ident), LitStr::value);
    let doc = doc_text(&function.attrs);

    let specs = params.iter().map(|param| {
        let name = param_name(&param.ident);
        let shape = shape_tokens(&param.ty);
        let default = options
            .defaults
            .iter()
            .find(|(ident, _)| *ident == param.ident)
            .map(|(_, value)| {
                quote! { .with_default(::bot_tools::__private::serde_json::json!(#value)) }
            });
        quote! {
            .with_param(::bot_tools::ParamSpec::new(#name, #shape) #default)
        }
    });

    let decode = params.iter().map(|param| {
        let ident = &param.ident;
        let ty = &param.ty;
        let name = param_name(ident);
        quote! {
            let #ident: #ty = match __tool_args.get(#name) {
                ::core::result::Result::Ok(value) => value,
                ::core::result::Result::Err(err) => {
                    return ::core::result::Result::Err(::bot_tools::CallError::from(err));
                }
            };
        }
    });

    let idents: Vec<&Ident> = params.iter().map(|param| &param.ident).collect();
    let (context_ty, context_binding, context_arg, context_decl) = match &context {
        Some(param) => {
            let ty = &param.ty;
            let ident = &param.ident;
            let name = param_name(ident);
            (
                quote! { #ty },
                quote! { #ident: #ty },
                quote! { #ident, },
                quote! { .with_context_param(#name) },
            )
        }
        None => (quote! { () }, quote! { _: () }, quote! {}, quote! {}),
    };

    let call = quote! { #fn_ident(#context_arg #(#idents),*) };
    let args_ident = if params.is_empty() {
        format_ident!("_tool_args")
    } else {
        format_ident!("__tool_args")
    };
    let constructor_body = if sig.asyncness.is_some() {
        quote! {
            ::bot_tools::ToolFunction::from_async(
                #tool_name,
                |#context_binding, #args_ident: ::bot_tools::Arguments| async move {
                    #(#decode)*
                    ::bot_tools::ToolOutput::into_tool_output(#call.await)
                },
            )
        }
    } else {
        quote! {
            ::bot_tools::ToolFunction::from_sync(
                #tool_name,
                |#context_binding, #args_ident: ::bot_tools::Arguments| -> ::bot_tools::CallResult {
                    #(#decode)*
                    ::bot_tools::ToolOutput::into_tool_output(#call)
                },
            )
        }
    };

    let doc_comment = format!("Tool constructor generated for [`{fn_ident}`].");
    Ok(quote! {
        #[doc = #doc_comment]
        #[must_use]
        #vis fn #constructor() -> ::bot_tools::ToolFunction<#context_ty> {
            #constructor_body
            .with_doc(#doc)
            #context_decl
            #(#specs)*
        }
    })
}

/// Identifier as the model sees it, without a raw-identifier prefix.
fn param_name(ident: &Ident) -> String {
    ident.unraw().to_string()
}

fn shape_tokens(ty: &Type) -> TokenStream2 {
    match ty {
        Type::Path(_) => quote! { <#ty as ::bot_tools::ToolParam>::shape() },
        Type::Paren(inner) => shape_tokens(&inner.elem),
        Type::Group(inner) => shape_tokens(&inner.elem),
        other => {
            let rendered = quote!(#other).to_string();
            quote! { ::bot_tools::TypeShape::Unsupported(::std::string::String::from(#rendered)) }
        }
    }
}

fn doc_text(attrs: &[Attribute]) -> String {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(named) => match &named.value {
                Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(text),
                    ..
                }) => Some(text.value()),
                _ => None,
            },
            _ => None,
        })
        .collect();
    lines.join("\n")
}
