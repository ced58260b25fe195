/// Generates chainable setters for configuration structs.
///
/// ```ignore
/// config_setters!(QLearningConfig { gamma: f32, alpha: f32 });
/// let config = QLearningConfig::default().gamma(0.9).alpha(0.5);
/// ```
macro_rules! config_setters {
    ($config:ident { $( $field:ident : $ty:ty ),* $(,)? }) => {
        impl $config {
            $(
                #[doc = concat!("Set `", stringify!($field), "`.")]
                pub fn $field(mut self, $field: $ty) -> Self {
                    self.$field = $field;
                    self
                }
            )*
        }
    };
}
