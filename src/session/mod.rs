pub mod director;
