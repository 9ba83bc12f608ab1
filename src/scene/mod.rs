pub mod scene_object;
