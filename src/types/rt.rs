//! Runtime Collection Adapter: the fixed descriptor set for the built-in
//! list type, its backing dynamic array and its iterator.
//!
//! The lowering engine uses these purely as call targets. Mutation through
//! the adapter (append, indexed write) is always permitted; binding-level
//! mutability only gates reassignment of the reference holding the list.

/// The list wrapper shipped with the runtime support library
pub const LIST_CLASS: &str = "sable/runtime/List";
/// Backing dynamic array inside the wrapper
pub const ARRAY_LIST_CLASS: &str = "java/util/ArrayList";
/// Iterator interface returned by [`ITERATOR`]
pub const ITERATOR_CLASS: &str = "java/util/Iterator";

/// A fixed method signature on one of the adapter types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSig {
    pub name: &'static str,
    pub descriptor: &'static str,
}

/// Wrapper constructor
pub const CONSTRUCT: MethodSig = MethodSig { name: "<init>", descriptor: "()V" };
/// Append one (boxed) element at the end
pub const APPEND: MethodSig = MethodSig { name: "append", descriptor: "(Ljava/lang/Object;)V" };
/// Read the element at an index
pub const GET: MethodSig = MethodSig { name: "get", descriptor: "(I)Ljava/lang/Object;" };
/// Overwrite the element at an index
pub const SET: MethodSig = MethodSig { name: "set", descriptor: "(ILjava/lang/Object;)V" };
/// Current element count
pub const SIZE: MethodSig = MethodSig { name: "size", descriptor: "()I" };
/// Acquire an iterator over the backing array
pub const ITERATOR: MethodSig = MethodSig { name: "iterator", descriptor: "()Ljava/util/Iterator;" };

// Iterator interface methods
pub const HAS_NEXT: MethodSig = MethodSig { name: "hasNext", descriptor: "()Z" };
pub const NEXT: MethodSig = MethodSig { name: "next", descriptor: "()Ljava/lang/Object;" };
