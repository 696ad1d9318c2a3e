//! Access and property flags for classes, fields and methods

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;

/// The flag combination carried by every synthesized static member
pub const PUBLIC_STATIC: u16 = ACC_PUBLIC | ACC_STATIC;
