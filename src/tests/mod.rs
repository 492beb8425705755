mod analysis_tests;
mod auth_tests;
mod cache_tests;
mod extraction_tests;
mod file_service_tests;
mod models_tests;
