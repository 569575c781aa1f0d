pub mod dialogs;
pub mod flight_editor;
pub mod flight_list;
pub mod theme;
pub mod timeline_chart;
pub mod toolbar;
