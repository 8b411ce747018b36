pub mod led_color;
pub mod stream;
