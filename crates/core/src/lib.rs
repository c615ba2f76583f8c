pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod frame;
    pub mod video_metadata;
}

pub mod detection {
    pub mod domain {
        pub mod class_label_table;
        pub mod color_picker;
        pub mod detection;
        pub mod detection_postprocessor;
        pub mod non_max_suppression;
        pub mod object_detector;
        pub mod postprocess_config;
    }
    pub mod infrastructure;
}

pub mod rendering {
    pub mod domain {
        pub mod frame_renderer;
    }
    pub mod infrastructure {
        pub mod overlay_renderer;
    }
}

pub mod video {
    pub mod domain {
        pub mod image_writer;
        pub mod video_reader;
        pub mod video_writer;
    }
    pub mod infrastructure {
        pub mod ffmpeg_reader;
        pub mod ffmpeg_writer;
        pub mod image_file_reader;
        pub mod image_file_writer;
    }
}

pub mod pipeline {
    pub mod annotate_frames_use_case;
    pub mod pipeline_logger;
}
