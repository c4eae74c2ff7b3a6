pub mod entity_form;
pub mod map_view;
pub mod toolbar;
