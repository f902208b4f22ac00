mod get_test;
mod put_test;
