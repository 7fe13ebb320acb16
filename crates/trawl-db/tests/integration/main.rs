mod article_tests;
mod common;
mod source_tests;
