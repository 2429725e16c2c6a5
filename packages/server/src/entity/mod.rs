pub mod upload_record;
