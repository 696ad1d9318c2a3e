//! Type catalog: interned mapping from source-level types to target-format
//! descriptors.
//!
//! The catalog is constructed once per compilation unit and passed by
//! reference to every component; identical source types always resolve to
//! the same [`TypeId`], so descriptor equality is an id comparison.

pub mod rt;

use crate::ast;
use crate::classfile::opcodes;
use std::collections::HashMap;

/// Interned handle to a [`TypeDesc`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

/// Semantic type tag plus everything needed to pick opcodes for it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    Int,
    Float,
    Double,
    Boolean,
    Str,
    Void,
    /// Reference to a class by internal name
    Object(String),
    /// The built-in list wrapper, tagged with its element type
    List(TypeId),
    /// The runtime iterator acquired from a list
    Iterator,
}

/// Boxing conversion for a primitive crossing an `Object`-typed boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boxing {
    /// Box class internal name, e.g. `java/lang/Integer`
    pub class: &'static str,
    /// Descriptor of the static `valueOf` factory
    pub box_descriptor: &'static str,
    /// Instance method producing the primitive back, e.g. `intValue`
    pub unbox_name: &'static str,
    pub unbox_descriptor: &'static str,
}

// Pre-interned ids for the fixed types; `TypeCatalog::new` fills these
// slots in this order
pub const INT: TypeId = TypeId(0);
pub const FLOAT: TypeId = TypeId(1);
pub const DOUBLE: TypeId = TypeId(2);
pub const BOOLEAN: TypeId = TypeId(3);
pub const STR: TypeId = TypeId(4);
pub const VOID: TypeId = TypeId(5);
pub const ITERATOR: TypeId = TypeId(6);

#[derive(Debug)]
pub struct TypeCatalog {
    types: Vec<TypeDesc>,
    lookup: HashMap<TypeDesc, TypeId>,
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeCatalog {
    pub fn new() -> Self {
        let mut catalog = Self { types: Vec::new(), lookup: HashMap::new() };
        for desc in [
            TypeDesc::Int,
            TypeDesc::Float,
            TypeDesc::Double,
            TypeDesc::Boolean,
            TypeDesc::Str,
            TypeDesc::Void,
            TypeDesc::Iterator,
        ] {
            catalog.intern(desc);
        }
        catalog
    }

    fn intern(&mut self, desc: TypeDesc) -> TypeId {
        if let Some(&id) = self.lookup.get(&desc) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(desc.clone());
        self.lookup.insert(desc, id);
        id
    }

    /// Map a source type to its interned descriptor. Total for every type a
    /// checked tree can contain.
    pub fn resolve(&mut self, ty: &ast::Type) -> TypeId {
        match ty {
            ast::Type::Int => INT,
            ast::Type::Float => FLOAT,
            ast::Type::Double => DOUBLE,
            ast::Type::Bool => BOOLEAN,
            ast::Type::Str => STR,
            ast::Type::Void => VOID,
            ast::Type::Object(name) => self.intern(TypeDesc::Object(name.clone())),
            ast::Type::List(elem) => {
                let elem_id = self.resolve(elem);
                self.intern(TypeDesc::List(elem_id))
            }
        }
    }

    pub fn get(&self, id: TypeId) -> &TypeDesc {
        &self.types[id.0 as usize]
    }

    /// JVM field descriptor for the type
    pub fn descriptor(&self, id: TypeId) -> String {
        match self.get(id) {
            TypeDesc::Int => "I".to_string(),
            TypeDesc::Float => "F".to_string(),
            TypeDesc::Double => "D".to_string(),
            TypeDesc::Boolean => "Z".to_string(),
            TypeDesc::Str => "Ljava/lang/String;".to_string(),
            TypeDesc::Void => "V".to_string(),
            TypeDesc::Object(name) => format!("L{};", name),
            TypeDesc::List(_) => format!("L{};", rt::LIST_CLASS),
            TypeDesc::Iterator => format!("L{};", rt::ITERATOR_CLASS),
        }
    }

    /// Width in stack/local slots
    pub fn width(&self, id: TypeId) -> u16 {
        match self.get(id) {
            TypeDesc::Double => 2,
            TypeDesc::Void => 0,
            _ => 1,
        }
    }

    pub fn is_wide(&self, id: TypeId) -> bool {
        self.width(id) == 2
    }

    pub fn is_reference(&self, id: TypeId) -> bool {
        matches!(
            self.get(id),
            TypeDesc::Str | TypeDesc::Object(_) | TypeDesc::List(_) | TypeDesc::Iterator
        )
    }

    pub fn load_opcode(&self, id: TypeId) -> u8 {
        match self.get(id) {
            TypeDesc::Int | TypeDesc::Boolean => opcodes::ILOAD,
            TypeDesc::Float => opcodes::FLOAD,
            TypeDesc::Double => opcodes::DLOAD,
            _ => opcodes::ALOAD,
        }
    }

    pub fn store_opcode(&self, id: TypeId) -> u8 {
        match self.get(id) {
            TypeDesc::Int | TypeDesc::Boolean => opcodes::ISTORE,
            TypeDesc::Float => opcodes::FSTORE,
            TypeDesc::Double => opcodes::DSTORE,
            _ => opcodes::ASTORE,
        }
    }

    pub fn return_opcode(&self, id: TypeId) -> u8 {
        match self.get(id) {
            TypeDesc::Int | TypeDesc::Boolean => opcodes::IRETURN,
            TypeDesc::Float => opcodes::FRETURN,
            TypeDesc::Double => opcodes::DRETURN,
            TypeDesc::Void => opcodes::RETURN,
            _ => opcodes::ARETURN,
        }
    }

    /// Boxing conversion if the type is a primitive, `None` for references
    pub fn boxing(&self, id: TypeId) -> Option<Boxing> {
        match self.get(id) {
            TypeDesc::Int => Some(Boxing {
                class: "java/lang/Integer",
                box_descriptor: "(I)Ljava/lang/Integer;",
                unbox_name: "intValue",
                unbox_descriptor: "()I",
            }),
            TypeDesc::Float => Some(Boxing {
                class: "java/lang/Float",
                box_descriptor: "(F)Ljava/lang/Float;",
                unbox_name: "floatValue",
                unbox_descriptor: "()F",
            }),
            TypeDesc::Double => Some(Boxing {
                class: "java/lang/Double",
                box_descriptor: "(D)Ljava/lang/Double;",
                unbox_name: "doubleValue",
                unbox_descriptor: "()D",
            }),
            TypeDesc::Boolean => Some(Boxing {
                class: "java/lang/Boolean",
                box_descriptor: "(Z)Ljava/lang/Boolean;",
                unbox_name: "booleanValue",
                unbox_descriptor: "()Z",
            }),
            _ => None,
        }
    }

    /// Internal class name to `checkcast` to when a value of this type comes
    /// back from an `Object`-typed adapter method
    pub fn cast_class(&self, id: TypeId) -> Option<String> {
        match self.get(id) {
            TypeDesc::Str => Some("java/lang/String".to_string()),
            TypeDesc::Object(name) => Some(name.clone()),
            TypeDesc::List(_) => Some(rt::LIST_CLASS.to_string()),
            _ => self.boxing(id).map(|b| b.class.to_string()),
        }
    }

    /// Build a method descriptor from parameter and return ids
    pub fn method_descriptor(&self, params: &[TypeId], ret: TypeId) -> String {
        let mut d = String::from("(");
        for p in params {
            d.push_str(&self.descriptor(*p));
        }
        d.push(')');
        d.push_str(&self.descriptor(ret));
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_types_resolve_to_fixed_ids() {
        let mut catalog = TypeCatalog::new();
        assert_eq!(catalog.resolve(&ast::Type::Int), INT);
        assert_eq!(catalog.resolve(&ast::Type::Double), DOUBLE);
        assert_eq!(catalog.resolve(&ast::Type::Void), VOID);
    }

    #[test]
    fn identical_source_types_intern_to_identical_ids() {
        let mut catalog = TypeCatalog::new();
        let a = catalog.resolve(&ast::Type::list_of(ast::Type::Int));
        let b = catalog.resolve(&ast::Type::list_of(ast::Type::Int));
        assert_eq!(a, b);
        let c = catalog.resolve(&ast::Type::list_of(ast::Type::Str));
        assert_ne!(a, c);
    }

    #[test]
    fn descriptors_and_widths() {
        let mut catalog = TypeCatalog::new();
        let list = catalog.resolve(&ast::Type::list_of(ast::Type::Int));
        assert_eq!(catalog.descriptor(list), "Lsable/runtime/List;");
        assert_eq!(catalog.descriptor(DOUBLE), "D");
        assert_eq!(catalog.width(DOUBLE), 2);
        assert_eq!(catalog.width(VOID), 0);
        assert_eq!(catalog.width(list), 1);
    }

    #[test]
    fn method_descriptor_building() {
        let catalog = TypeCatalog::new();
        assert_eq!(catalog.method_descriptor(&[INT, STR], VOID), "(ILjava/lang/String;)V");
        assert_eq!(catalog.method_descriptor(&[], DOUBLE), "()D");
    }
}
