// Fixed names shared across the backend

// Source file extension for Sable units; the backend itself only ever sees
// parsed trees, this is convention for callers
pub const SOURCE_EXT: &str = ".sb";

// Well-known JVM classes referenced by emitted code
pub const OBJECT_CLASS: &str = "java/lang/Object";
pub const STRING_CLASS: &str = "java/lang/String";
pub const STRING_BUILDER_CLASS: &str = "java/lang/StringBuilder";

// Runtime support library expected on the class path at load time
pub const PRELUDE_CLASS: &str = "sable/runtime/Prelude";
