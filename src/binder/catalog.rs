//! In-memory binder
//!
//! `TypeCatalog` is a declarative implementation of [`Binder`] used by the
//! test suite: tests register types, members, and locals up front and the
//! catalog answers the engine's resolution queries. Overload selection is
//! arity/convertibility based and picks the first applicable candidate in
//! declaration order — real ambiguity handling belongs to a production
//! binder.

use rustc_hash::FxHashMap;

use super::error::LowerError;
use super::types::{self, builtin_infos, TypeId, TypeInfo, TypeKind, WELL_KNOWN};
use super::{Binder, ChosenOverload, ConversionKind, MemberRef, OverloadSet, ParamInfo};
use crate::syntax::{ConstValue, Span};

/// Declaration of one parameter of a constructor, `Add` method, or indexer.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    name: String,
    ty: TypeId,
    default: Option<ConstValue>,
    is_params: bool,
}

impl ParamSpec {
    /// Required parameter.
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self { name: name.into(), ty, default: None, is_params: false }
    }

    /// Optional parameter with a default value.
    pub fn with_default(name: impl Into<String>, ty: TypeId, default: ConstValue) -> Self {
        Self { name: name.into(), ty, default: Some(default), is_params: false }
    }

    /// Trailing `params` array parameter; `elem_ty` is the element type.
    pub fn params(name: impl Into<String>, elem_ty: TypeId) -> Self {
        Self { name: name.into(), ty: elem_ty, default: None, is_params: true }
    }

    fn info(&self) -> ParamInfo {
        ParamInfo {
            name: self.name.clone(),
            ty: self.ty,
            default: self.default.clone(),
            is_params: self.is_params,
        }
    }
}

#[derive(Debug, Clone)]
struct PropertyDef {
    name: String,
    ty: TypeId,
    has_getter: bool,
}

#[derive(Debug, Clone, Default)]
struct ClassDef {
    fields: Vec<(String, TypeId)>,
    properties: Vec<PropertyDef>,
    ctors: Vec<Vec<ParamSpec>>,
    adds: Vec<Vec<ParamSpec>>,
    indexers: Vec<(Vec<ParamSpec>, TypeId)>,
}

/// Declarative type/member table implementing [`Binder`].
pub struct TypeCatalog {
    types: Vec<TypeInfo>,
    by_name: FxHashMap<String, TypeId>,
    classes: FxHashMap<TypeId, ClassDef>,
    arrays: FxHashMap<TypeId, TypeId>,
    locals: FxHashMap<String, TypeId>,
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeCatalog {
    /// A catalog seeded with the builtin types.
    pub fn new() -> Self {
        Self {
            types: builtin_infos(),
            by_name: FxHashMap::default(),
            classes: FxHashMap::default(),
            arrays: FxHashMap::default(),
            locals: FxHashMap::default(),
        }
    }

    /// Declare a reference type with the given source name.
    pub fn declare_class(&mut self, name: impl Into<String>) -> TypeId {
        let name = name.into();
        let id = TypeId::new(self.types.len() as u32);
        self.types.push(TypeInfo::new(name.clone(), TypeKind::Class));
        self.by_name.insert(name, id);
        self.classes.insert(id, ClassDef::default());
        id
    }

    /// Set the base class of a declared type.
    pub fn set_base(&mut self, ty: TypeId, base: TypeId) {
        self.types[ty.as_u32() as usize].base = Some(base);
    }

    /// Override the `IEnumerable` capability of a declared type.
    pub fn set_enumerable(&mut self, ty: TypeId, is_enumerable: bool) {
        self.types[ty.as_u32() as usize].is_enumerable = is_enumerable;
    }

    /// Declare an instance field.
    pub fn add_field(&mut self, ty: TypeId, name: impl Into<String>, field_ty: TypeId) {
        self.class_mut(ty).fields.push((name.into(), field_ty));
    }

    /// Declare a read/write property.
    pub fn add_property(&mut self, ty: TypeId, name: impl Into<String>, prop_ty: TypeId) {
        self.class_mut(ty).properties.push(PropertyDef {
            name: name.into(),
            ty: prop_ty,
            has_getter: true,
        });
    }

    /// Declare a set-only property (no accessible getter).
    pub fn add_property_setter_only(
        &mut self,
        ty: TypeId,
        name: impl Into<String>,
        prop_ty: TypeId,
    ) {
        self.class_mut(ty).properties.push(PropertyDef {
            name: name.into(),
            ty: prop_ty,
            has_getter: false,
        });
    }

    /// Declare a constructor overload. Types with no declared constructor
    /// get an implicit parameterless one.
    pub fn add_ctor(&mut self, ty: TypeId, params: Vec<ParamSpec>) {
        self.register_param_arrays(&params);
        self.class_mut(ty).ctors.push(params);
    }

    /// Declare an `Add` overload; this also marks the type enumerable.
    pub fn add_add_method(&mut self, ty: TypeId, params: Vec<ParamSpec>) {
        self.register_param_arrays(&params);
        self.class_mut(ty).adds.push(params);
        self.types[ty.as_u32() as usize].is_enumerable = true;
    }

    /// Declare an indexer overload with the given element type.
    pub fn add_indexer(&mut self, ty: TypeId, params: Vec<ParamSpec>, value_ty: TypeId) {
        self.register_param_arrays(&params);
        self.class_mut(ty).indexers.push((params, value_ty));
    }

    /// Declare a local/parameter visible to lowered expressions.
    pub fn declare_local(&mut self, name: impl Into<String>, ty: TypeId) {
        self.locals.insert(name.into(), ty);
    }

    /// The array type `elem[]`, registering it on first use.
    pub fn array_of(&mut self, elem: TypeId) -> TypeId {
        if let Some(&id) = self.arrays.get(&elem) {
            return id;
        }
        let name = format!("{}[]", self.types[elem.as_u32() as usize].name);
        let id = TypeId::new(self.types.len() as u32);
        let mut info = TypeInfo::new(name, TypeKind::Array);
        info.element = Some(elem);
        self.types.push(info);
        self.arrays.insert(elem, id);
        id
    }

    fn class_mut(&mut self, ty: TypeId) -> &mut ClassDef {
        self.classes.entry(ty).or_default()
    }

    fn register_param_arrays(&mut self, params: &[ParamSpec]) {
        let elems: Vec<TypeId> =
            params.iter().filter(|p| p.is_params).map(|p| p.ty).collect();
        for elem in elems {
            self.array_of(elem);
        }
    }

    fn type_name(&self, ty: TypeId) -> &str {
        &self.types[ty.as_u32() as usize].name
    }

    fn convertible(&self, from: TypeId, to: TypeId) -> bool {
        self.resolve_conversion(from, to).is_some()
    }

    fn applicable(&self, args: &[TypeId], params: &[ParamSpec]) -> bool {
        let has_params = params.last().map(|p| p.is_params).unwrap_or(false);
        let fixed = if has_params { params.len() - 1 } else { params.len() };

        if !has_params && args.len() > fixed {
            return false;
        }
        for (i, param) in params[..fixed].iter().enumerate() {
            match args.get(i) {
                Some(&arg) => {
                    if !self.convertible(arg, param.ty) {
                        return false;
                    }
                }
                None => {
                    if param.default.is_none() {
                        return false;
                    }
                }
            }
        }
        if has_params {
            let elem = params[fixed].ty;
            for &arg in args.iter().skip(fixed) {
                if !self.convertible(arg, elem) {
                    return false;
                }
            }
        }
        true
    }

    fn choose(
        &self,
        owner: TypeId,
        name: &str,
        candidates: &[Vec<ParamSpec>],
        rets: Option<&[TypeId]>,
        args: &[TypeId],
        span: Span,
    ) -> Result<ChosenOverload, LowerError> {
        for (i, params) in candidates.iter().enumerate() {
            if self.applicable(args, params) {
                return Ok(ChosenOverload {
                    owner,
                    name: name.to_string(),
                    params: params.iter().map(|p| p.info()).collect(),
                    ret: rets.map(|r| r[i]).unwrap_or(types::VOID),
                });
            }
        }
        Err(LowerError::ArgumentCount {
            type_name: self.type_name(owner).to_string(),
            method: name.to_string(),
            actual: args.len(),
            span,
        })
    }
}

impl Binder for TypeCatalog {
    fn lookup_type(&self, name: &str) -> Option<TypeId> {
        self.by_name
            .get(name)
            .copied()
            .or_else(|| WELL_KNOWN.get(name).copied())
    }

    fn type_info(&self, ty: TypeId) -> &TypeInfo {
        &self.types[ty.as_u32() as usize]
    }

    fn local_type(&self, name: &str) -> Option<TypeId> {
        self.locals.get(name).copied()
    }

    fn resolve_member(
        &self,
        receiver: TypeId,
        name: &str,
        span: Span,
    ) -> Result<MemberRef, LowerError> {
        if self.type_info(receiver).is_dynamic() {
            return Ok(MemberRef::Dynamic { name: name.to_string() });
        }
        let mut current = Some(receiver);
        while let Some(ty) = current {
            if let Some(class) = self.classes.get(&ty) {
                if let Some((name, field_ty)) =
                    class.fields.iter().find(|(n, _)| n == name)
                {
                    return Ok(MemberRef::Field { name: name.clone(), ty: *field_ty });
                }
                if let Some(prop) = class.properties.iter().find(|p| p.name == name) {
                    return Ok(MemberRef::Property {
                        name: prop.name.clone(),
                        ty: prop.ty,
                        has_getter: prop.has_getter,
                    });
                }
            }
            current = self.type_info(ty).base;
        }
        Err(LowerError::MemberResolution {
            type_name: self.type_name(receiver).to_string(),
            member: name.to_string(),
            span,
        })
    }

    fn resolve_overload(
        &self,
        set: OverloadSet,
        args: &[TypeId],
        span: Span,
    ) -> Result<ChosenOverload, LowerError> {
        match set {
            OverloadSet::Constructors(ty) => {
                let empty = Vec::new();
                let ctors = self.classes.get(&ty).map(|c| &c.ctors).unwrap_or(&empty);
                if ctors.is_empty() {
                    // Implicit parameterless constructor
                    if args.is_empty() {
                        return Ok(ChosenOverload {
                            owner: ty,
                            name: ".ctor".to_string(),
                            params: Vec::new(),
                            ret: ty,
                        });
                    }
                    return Err(LowerError::ArgumentCount {
                        type_name: self.type_name(ty).to_string(),
                        method: ".ctor".to_string(),
                        actual: args.len(),
                        span,
                    });
                }
                let mut chosen = self.choose(ty, ".ctor", ctors, None, args, span)?;
                chosen.ret = ty;
                Ok(chosen)
            }
            OverloadSet::AddMethods(ty) => {
                let empty = Vec::new();
                let adds = self.classes.get(&ty).map(|c| &c.adds).unwrap_or(&empty);
                if adds.is_empty() {
                    return Err(LowerError::MemberResolution {
                        type_name: self.type_name(ty).to_string(),
                        member: "Add".to_string(),
                        span,
                    });
                }
                self.choose(ty, "Add", adds, None, args, span)
            }
            OverloadSet::Indexers(ty) => {
                let empty = Vec::new();
                let indexers =
                    self.classes.get(&ty).map(|c| &c.indexers).unwrap_or(&empty);
                if indexers.is_empty() {
                    return Err(LowerError::MemberResolution {
                        type_name: self.type_name(ty).to_string(),
                        member: "this[]".to_string(),
                        span,
                    });
                }
                let params: Vec<Vec<ParamSpec>> =
                    indexers.iter().map(|(p, _)| p.clone()).collect();
                let rets: Vec<TypeId> = indexers.iter().map(|(_, r)| *r).collect();
                self.choose(ty, "this[]", &params, Some(&rets), args, span)
            }
        }
    }

    fn resolve_conversion(&self, from: TypeId, to: TypeId) -> Option<ConversionKind> {
        if from == to {
            return Some(ConversionKind::Identity);
        }
        // Stay permissive around the error type so one failure does not
        // cascade into unrelated diagnostics.
        if from == types::ERROR || to == types::ERROR {
            return Some(ConversionKind::Identity);
        }
        if from == types::DYNAMIC || to == types::DYNAMIC {
            return Some(ConversionKind::ImplicitReference);
        }
        if from == types::NULL {
            return match self.type_info(to).kind {
                TypeKind::Class | TypeKind::Array => Some(ConversionKind::ImplicitReference),
                _ => None,
            };
        }
        let widening = matches!(
            (from, to),
            (types::INT32, types::INT64)
                | (types::INT32, types::DOUBLE)
                | (types::INT64, types::DOUBLE)
        );
        if widening {
            return Some(ConversionKind::ImplicitNumeric);
        }
        if to == types::OBJECT {
            return match self.type_info(from).kind {
                TypeKind::Value => Some(ConversionKind::Boxing),
                TypeKind::Class | TypeKind::Array => Some(ConversionKind::ImplicitReference),
                _ => None,
            };
        }
        // Derived-to-base reference conversion
        let mut base = self.type_info(from).base;
        while let Some(b) = base {
            if b == to {
                return Some(ConversionKind::ImplicitReference);
            }
            base = self.type_info(b).base;
        }
        None
    }

    fn lookup_array(&self, elem: TypeId) -> Option<TypeId> {
        self.arrays.get(&elem).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::types::{BOOL, DOUBLE, INT32, INT64, OBJECT, STRING};

    fn catalog_with_c() -> (TypeCatalog, TypeId) {
        let mut cat = TypeCatalog::new();
        let c = cat.declare_class("C");
        cat.add_field(c, "Field", INT32);
        cat.add_property(c, "Name", STRING);
        cat.add_add_method(c, vec![ParamSpec::new("item", INT32)]);
        cat.add_indexer(c, vec![ParamSpec::new("i", INT32)], STRING);
        (cat, c)
    }

    #[test]
    fn test_member_lookup() {
        let (cat, c) = catalog_with_c();
        let m = cat.resolve_member(c, "Field", Span::ZERO).unwrap();
        assert_eq!(m, MemberRef::Field { name: "Field".to_string(), ty: INT32 });
        let err = cat.resolve_member(c, "Missing", Span::ZERO).unwrap_err();
        assert!(matches!(err, LowerError::MemberResolution { .. }));
    }

    #[test]
    fn test_member_lookup_through_base() {
        let (mut cat, c) = catalog_with_c();
        let d = cat.declare_class("D");
        cat.set_base(d, c);
        let m = cat.resolve_member(d, "Name", Span::ZERO).unwrap();
        assert!(matches!(m, MemberRef::Property { .. }));
    }

    #[test]
    fn test_implicit_parameterless_ctor() {
        let (cat, c) = catalog_with_c();
        let chosen = cat
            .resolve_overload(OverloadSet::Constructors(c), &[], Span::ZERO)
            .unwrap();
        assert_eq!(chosen.name, ".ctor");
        assert!(chosen.params.is_empty());
        let err = cat
            .resolve_overload(OverloadSet::Constructors(c), &[INT32], Span::ZERO)
            .unwrap_err();
        assert!(matches!(err, LowerError::ArgumentCount { actual: 1, .. }));
    }

    #[test]
    fn test_add_overload_with_params_array() {
        let (mut cat, c) = catalog_with_c();
        cat.add_add_method(
            c,
            vec![ParamSpec::new("key", STRING), ParamSpec::params("rest", INT32)],
        );
        let one = cat
            .resolve_overload(OverloadSet::AddMethods(c), &[INT32], Span::ZERO)
            .unwrap();
        assert_eq!(one.params.len(), 1);
        let many = cat
            .resolve_overload(
                OverloadSet::AddMethods(c),
                &[STRING, INT32, INT32],
                Span::ZERO,
            )
            .unwrap();
        assert!(many.params.last().unwrap().is_params);
    }

    #[test]
    fn test_defaults_fill_missing_arguments() {
        let mut cat = TypeCatalog::new();
        let k = cat.declare_class("K");
        cat.add_ctor(
            k,
            vec![
                ParamSpec::new("x", INT32),
                ParamSpec::with_default("y", INT32, ConstValue::Int(7)),
            ],
        );
        let chosen = cat
            .resolve_overload(OverloadSet::Constructors(k), &[INT32], Span::ZERO)
            .unwrap();
        assert_eq!(chosen.params.len(), 2);
        assert_eq!(chosen.params[1].default, Some(ConstValue::Int(7)));
    }

    #[test]
    fn test_conversions() {
        let cat = TypeCatalog::new();
        assert_eq!(
            cat.resolve_conversion(INT32, INT32),
            Some(ConversionKind::Identity)
        );
        assert_eq!(
            cat.resolve_conversion(INT32, DOUBLE),
            Some(ConversionKind::ImplicitNumeric)
        );
        assert_eq!(
            cat.resolve_conversion(INT32, OBJECT),
            Some(ConversionKind::Boxing)
        );
        assert_eq!(
            cat.resolve_conversion(STRING, OBJECT),
            Some(ConversionKind::ImplicitReference)
        );
        assert_eq!(cat.resolve_conversion(DOUBLE, INT64), None);
        assert_eq!(cat.resolve_conversion(BOOL, INT32), None);
    }

    #[test]
    fn test_array_registration() {
        let mut cat = TypeCatalog::new();
        let arr = cat.array_of(INT32);
        assert_eq!(cat.type_info(arr).name, "System.Int32[]");
        assert_eq!(cat.array_of(INT32), arr);
    }
}
