mod validation_engine;


pub use validation_engine::ValidationEngine;
