//! Helper macros for ABI function generation.
//!
//! Provides the `abi_fn!` macro that generates `pub unsafe extern "C" fn`
//! entry points, exported unmangled when the `export-symbols` feature is on.

/// Generate an ABI entry point.
///
/// # Usage
///
/// ```ignore
/// abi_fn! {
///     /// Doc comment for the function.
///     fn my_func(arg1: Type1, arg2: Type2) -> ReturnType {
///         // implementation body
///     }
/// }
/// ```
///
/// The body is emitted as written; pointer reinterpretation inside it carries
/// its own `unsafe` block.
#[allow(unused_macros)]
macro_rules! abi_fn {
    (
        $(#[$meta:meta])*
        fn $name:ident( $($arg:ident : $argty:ty),* $(,)? ) -> $ret:ty
        $body:block
    ) => {
        $(#[$meta])*
        #[cfg_attr(feature = "export-symbols", unsafe(no_mangle))]
        pub unsafe extern "C" fn $name( $($arg : $argty),* ) -> $ret
        $body
    };
}

#[allow(unused_imports)]
pub(crate) use abi_fn;
