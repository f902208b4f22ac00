mod health_test;
mod subjects;
