pub mod blow;
