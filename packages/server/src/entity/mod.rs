pub mod detected_sub_image;
pub mod recognition_task;
pub mod upload_archive;
pub mod uploaded_file;
pub mod user;
