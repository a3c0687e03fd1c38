pub mod character_grid;
pub mod menu;
pub mod progress_bar;
pub mod quiz_area;
