/// Configuration macros for zero-repetition config definitions
///
/// `config_struct!` defines a configuration section with its defaults in a
/// single declaration and generates:
/// - the struct with public fields
/// - a `Default` implementation using the declared values
/// - serde support with `#[serde(default)]`, so partial TOML files work
///
/// # Example
/// ```ignore
/// config_struct! {
///     pub struct RelayConfig {
///         poll_interval_secs: u64 = 5,
///         keep_alive_secs: u64 = 15,
///     }
/// }
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
