pub mod predict_types;
