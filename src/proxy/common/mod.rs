pub mod response_classifier;
