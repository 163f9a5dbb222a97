//! Allocator implementations (and adapters) to drive with the harness

#[path = "adapt/_adapt.rs"  ] pub mod adapt;
#[path = "c/_c.rs"          ] pub mod c;
#[path = "debug/_debug.rs"  ] pub mod debug;
#[path = "win32/_win32.rs"  ] pub mod win32;
