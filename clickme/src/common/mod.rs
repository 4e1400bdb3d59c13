mod buffer2;

pub use buffer2::Buffer2;
