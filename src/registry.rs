//! Type registry and method tables.
//!
//! Native types are described with a [`TypeDefinition`] builder: a
//! constructor, methods and properties. Each definition turns into a flat
//! [`MethodTable`] when registered; inherited members are copied into the
//! derived table at that point so dispatch never walks a chain.

use crate::bridge::Bridge;
use crate::error::{BridgeError, NativeError, Result};
use crate::marshal::{FromArgs, FromScript, IntoScript};
use crate::shape::Shape;
use crate::value::MarshaledValue;
use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

pub(crate) type MethodFn =
    Arc<dyn Fn(&mut dyn Any, &[MarshaledValue]) -> Result<MarshaledValue> + Send + Sync>;
pub(crate) type GetterFn = Arc<dyn Fn(&dyn Any) -> Result<MarshaledValue> + Send + Sync>;
pub(crate) type SetterFn = Arc<dyn Fn(&mut dyn Any, &MarshaledValue) -> Result<()> + Send + Sync>;
pub(crate) type FactoryFn =
    Arc<dyn Fn(&[MarshaledValue]) -> Result<Box<dyn Any + Send>> + Send + Sync>;
pub(crate) type FunctionFn =
    Arc<dyn Fn(&Bridge, &[MarshaledValue]) -> Result<MarshaledValue> + Send + Sync>;

/// Parameter list of a native callable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: Vec<Shape>,
    variadic: bool,
}

impl Signature {
    /// Exactly these parameters (trailing optionals may be omitted)
    pub fn fixed(params: Vec<Shape>) -> Self {
        Self {
            params,
            variadic: false,
        }
    }

    /// These parameters followed by any number of extra arguments
    pub fn variadic(params: Vec<Shape>) -> Self {
        Self {
            params,
            variadic: true,
        }
    }

    /// Declared parameter shapes
    pub fn params(&self) -> &[Shape] {
        &self.params
    }

    /// Number of arguments that must be supplied
    pub fn required(&self) -> usize {
        let optional_tail = self
            .params
            .iter()
            .rev()
            .take_while(|shape| shape.is_optional())
            .count();
        self.params.len() - optional_tail
    }

    /// Check a supplied argument count
    pub fn check(&self, callee: &str, got: usize) -> Result<()> {
        let required = self.required();
        if got < required || (!self.variadic && got > self.params.len()) {
            return Err(BridgeError::ArityMismatch {
                callee: callee.to_string(),
                expected: self.describe(),
                got,
            });
        }
        Ok(())
    }

    fn describe(&self) -> String {
        let required = self.required();
        if self.variadic {
            format!("at least {}", required)
        } else if required == self.params.len() {
            required.to_string()
        } else {
            format!("{} to {}", required, self.params.len())
        }
    }
}

pub(crate) struct MethodEntry {
    pub(crate) signature: Signature,
    pub(crate) closing: bool,
    pub(crate) call: MethodFn,
}

pub(crate) struct PropertyEntry {
    pub(crate) getter: GetterFn,
    pub(crate) setter: Option<SetterFn>,
}

pub(crate) enum Member {
    Method(MethodEntry),
    Property(PropertyEntry),
}

/// Flat, read-only table of a type's methods and properties
pub struct MethodTable {
    type_name: String,
    members: HashMap<String, Member>,
}

impl MethodTable {
    /// Type this table belongs to
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub(crate) fn method(&self, name: &str) -> Option<&MethodEntry> {
        match self.members.get(name) {
            Some(Member::Method(m)) => Some(m),
            _ => None,
        }
    }

    pub(crate) fn property(&self, name: &str) -> Option<&PropertyEntry> {
        match self.members.get(name) {
            Some(Member::Property(p)) => Some(p),
            _ => None,
        }
    }

    /// Check if a method of this name exists
    pub fn has_method(&self, name: &str) -> bool {
        self.method(name).is_some()
    }

    /// Check if a property of this name exists
    pub fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    /// Method names, sorted
    pub fn method_names(&self) -> Vec<&str> {
        self.names_where(|m| matches!(m, Member::Method(_)))
    }

    /// Property names, sorted
    pub fn property_names(&self) -> Vec<&str> {
        self.names_where(|m| matches!(m, Member::Property(_)))
    }

    fn names_where(&self, keep: impl Fn(&Member) -> bool) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .members
            .iter()
            .filter(|(_, member)| keep(member))
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

pub(crate) struct FactoryEntry {
    pub(crate) signature: Signature,
    pub(crate) create: FactoryFn,
}

/// Registered native type
pub struct TypeDescriptor {
    name: String,
    pub(crate) factory: Option<FactoryEntry>,
    table: Arc<MethodTable>,
}

impl TypeDescriptor {
    /// Script-visible type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether scripts may construct this type
    pub fn is_constructible(&self) -> bool {
        self.factory.is_some()
    }

    /// Shared method table
    pub fn methods(&self) -> &Arc<MethodTable> {
        &self.table
    }
}

fn state_of<'a, T: Any>(any: &'a mut dyn Any, type_name: &str) -> Result<&'a mut T> {
    any.downcast_mut::<T>().ok_or_else(|| {
        BridgeError::Internal(format!("native state of '{}' has an unexpected type", type_name))
    })
}

fn state_ref<'a, T: Any>(any: &'a dyn Any, type_name: &str) -> Result<&'a T> {
    any.downcast_ref::<T>().ok_or_else(|| {
        BridgeError::Internal(format!("native state of '{}' has an unexpected type", type_name))
    })
}

/// Builder describing how a native type `T` is exposed to scripts
pub struct TypeDefinition<T> {
    name: String,
    factory: Option<FactoryEntry>,
    members: HashMap<String, Member>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send> TypeDefinition<T> {
    /// Start a definition; without a constructor the type can not be created by scripts
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            factory: None,
            members: HashMap::new(),
            _marker: PhantomData,
        }
    }

    /// Type name as given to [`TypeDefinition::new`]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constructor taking a fixed parameter list
    pub fn constructor<A, F>(mut self, f: F) -> Self
    where
        A: FromArgs,
        F: Fn(A) -> std::result::Result<T, NativeError> + Send + Sync + 'static,
    {
        let create: FactoryFn = Arc::new(
            move |args: &[MarshaledValue]| -> Result<Box<dyn Any + Send>> {
                let state = f(A::from_args(args)?)?;
                Ok(Box::new(state))
            },
        );
        self.factory = Some(FactoryEntry {
            signature: Signature::fixed(A::shapes()),
            create,
        });
        self
    }

    /// Method taking a fixed parameter list
    pub fn method<A, R, F>(self, name: impl Into<String>, f: F) -> Self
    where
        A: FromArgs,
        R: IntoScript,
        F: Fn(&mut T, A) -> std::result::Result<R, NativeError> + Send + Sync + 'static,
    {
        self.typed_method(name.into(), false, f)
    }

    /// Method after whose success the bridge releases the handle
    pub fn closing_method<A, R, F>(self, name: impl Into<String>, f: F) -> Self
    where
        A: FromArgs,
        R: IntoScript,
        F: Fn(&mut T, A) -> std::result::Result<R, NativeError> + Send + Sync + 'static,
    {
        self.typed_method(name.into(), true, f)
    }

    /// Method receiving the raw argument list
    pub fn method_variadic<R, F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        R: IntoScript,
        F: Fn(&mut T, &[MarshaledValue]) -> std::result::Result<R, NativeError>
            + Send
            + Sync
            + 'static,
    {
        let type_name = self.name.clone();
        let call: MethodFn = Arc::new(
            move |any: &mut dyn Any, args: &[MarshaledValue]| -> Result<MarshaledValue> {
                let this = state_of::<T>(any, &type_name)?;
                Ok(f(this, args)?.into_script())
            },
        );
        self.members.insert(
            name.into(),
            Member::Method(MethodEntry {
                signature: Signature::variadic(Vec::new()),
                closing: false,
                call,
            }),
        );
        self
    }

    fn typed_method<A, R, F>(mut self, name: String, closing: bool, f: F) -> Self
    where
        A: FromArgs,
        R: IntoScript,
        F: Fn(&mut T, A) -> std::result::Result<R, NativeError> + Send + Sync + 'static,
    {
        let type_name = self.name.clone();
        let call: MethodFn = Arc::new(
            move |any: &mut dyn Any, args: &[MarshaledValue]| -> Result<MarshaledValue> {
                let args = A::from_args(args)?;
                let this = state_of::<T>(any, &type_name)?;
                Ok(f(this, args)?.into_script())
            },
        );
        self.members.insert(
            name,
            Member::Method(MethodEntry {
                signature: Signature::fixed(A::shapes()),
                closing,
                call,
            }),
        );
        self
    }

    /// Read/write property
    pub fn property<V, G, S>(mut self, name: impl Into<String>, get: G, set: S) -> Self
    where
        V: FromScript + IntoScript,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let type_name = self.name.clone();
        let setter: SetterFn = Arc::new(
            move |any: &mut dyn Any, value: &MarshaledValue| -> Result<()> {
                let value = V::from_script(value)?;
                set(state_of::<T>(any, &type_name)?, value);
                Ok(())
            },
        );
        let getter = self.getter(get);
        self.members.insert(
            name.into(),
            Member::Property(PropertyEntry {
                getter,
                setter: Some(setter),
            }),
        );
        self
    }

    /// Read-only property
    pub fn readonly_property<V, G>(mut self, name: impl Into<String>, get: G) -> Self
    where
        V: IntoScript,
        G: Fn(&T) -> V + Send + Sync + 'static,
    {
        let getter = self.getter(get);
        self.members.insert(
            name.into(),
            Member::Property(PropertyEntry {
                getter,
                setter: None,
            }),
        );
        self
    }

    fn getter<V, G>(&self, get: G) -> GetterFn
    where
        V: IntoScript,
        G: Fn(&T) -> V + Send + Sync + 'static,
    {
        let type_name = self.name.clone();
        Arc::new(move |any: &dyn Any| -> Result<MarshaledValue> {
            Ok(get(state_ref::<T>(any, &type_name)?).into_script())
        })
    }

    /// Copy the members of `base` into this table; members defined here win.
    pub fn inherit<B>(mut self, base: &TypeDefinition<B>) -> Self
    where
        B: Any + Send,
        T: AsRef<B> + AsMut<B>,
    {
        for (name, member) in &base.members {
            if self.members.contains_key(name) {
                continue;
            }
            let type_name = self.name.clone();
            let projected = match member {
                Member::Method(m) => {
                    let inner = Arc::clone(&m.call);
                    let call: MethodFn = Arc::new(
                        move |any: &mut dyn Any, args: &[MarshaledValue]| -> Result<MarshaledValue> {
                            let this = state_of::<T>(any, &type_name)?;
                            inner(AsMut::<B>::as_mut(this) as &mut dyn Any, args)
                        },
                    );
                    Member::Method(MethodEntry {
                        signature: m.signature.clone(),
                        closing: m.closing,
                        call,
                    })
                }
                Member::Property(p) => {
                    let inner_get = Arc::clone(&p.getter);
                    let get_type = type_name.clone();
                    let getter: GetterFn = Arc::new(move |any: &dyn Any| -> Result<MarshaledValue> {
                        let this = state_ref::<T>(any, &get_type)?;
                        inner_get(AsRef::<B>::as_ref(this) as &dyn Any)
                    });
                    let setter = p.setter.as_ref().map(|inner_set| {
                        let inner_set = Arc::clone(inner_set);
                        let setter: SetterFn = Arc::new(
                            move |any: &mut dyn Any, value: &MarshaledValue| -> Result<()> {
                                let this = state_of::<T>(any, &type_name)?;
                                inner_set(AsMut::<B>::as_mut(this) as &mut dyn Any, value)
                            },
                        );
                        setter
                    });
                    Member::Property(PropertyEntry { getter, setter })
                }
            };
            self.members.insert(name.clone(), projected);
        }
        self
    }

    pub(crate) fn into_descriptor(self, qualified_name: String) -> TypeDescriptor {
        TypeDescriptor {
            name: qualified_name.clone(),
            factory: self.factory,
            table: Arc::new(MethodTable {
                type_name: qualified_name,
                members: self.members,
            }),
        }
    }
}

/// Free function callable without a receiving handle
pub struct NativeFunction {
    name: String,
    pub(crate) signature: Signature,
    pub(crate) call: FunctionFn,
}

impl NativeFunction {
    /// Function taking a fixed parameter list
    pub fn new<A, R, F>(name: impl Into<String>, f: F) -> Self
    where
        A: FromArgs,
        R: IntoScript,
        F: Fn(&Bridge, A) -> Result<R> + Send + Sync + 'static,
    {
        let call: FunctionFn = Arc::new(
            move |bridge: &Bridge, args: &[MarshaledValue]| -> Result<MarshaledValue> {
                let args = A::from_args(args)?;
                Ok(f(bridge, args)?.into_script())
            },
        );
        Self {
            name: name.into(),
            signature: Signature::fixed(A::shapes()),
            call,
        }
    }

    /// Function receiving the raw argument list
    pub fn variadic<R, F>(name: impl Into<String>, f: F) -> Self
    where
        R: IntoScript,
        F: Fn(&Bridge, &[MarshaledValue]) -> Result<R> + Send + Sync + 'static,
    {
        let call: FunctionFn = Arc::new(
            move |bridge: &Bridge, args: &[MarshaledValue]| -> Result<MarshaledValue> {
                Ok(f(bridge, args)?.into_script())
            },
        );
        Self {
            name: name.into(),
            signature: Signature::variadic(Vec::new()),
            call,
        }
    }

    /// Script-visible function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

/// Named registration group, e.g. `file` exposing `file.writer`
pub struct Module {
    name: String,
    types: Vec<TypeDescriptor>,
    functions: Vec<NativeFunction>,
}

impl Module {
    /// Create an empty module
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Module name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a type, registered as `<module>.<type>`
    pub fn with_type<T: Any + Send>(mut self, definition: TypeDefinition<T>) -> Self {
        let qualified = self.qualify(definition.name());
        self.types.push(definition.into_descriptor(qualified));
        self
    }

    /// Add a function, registered as `<module>.<function>`
    pub fn with_function(mut self, mut function: NativeFunction) -> Self {
        function.name = self.qualify(&function.name);
        self.functions.push(function);
        self
    }

    fn qualify(&self, member: &str) -> String {
        if self.name.is_empty() {
            member.to_string()
        } else {
            format!("{}.{}", self.name, member)
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<TypeDescriptor>, Vec<NativeFunction>) {
        (self.types, self.functions)
    }
}

/// Registry of constructors and free functions by script-visible name
#[derive(Default)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<TypeDescriptor>>,
    functions: HashMap<String, Arc<NativeFunction>>,
}

impl TypeRegistry {
    pub(crate) fn register_type(&mut self, descriptor: TypeDescriptor) -> Result<()> {
        self.ensure_free(descriptor.name())?;
        self.types
            .insert(descriptor.name().to_string(), Arc::new(descriptor));
        Ok(())
    }

    pub(crate) fn register_function(&mut self, function: NativeFunction) -> Result<()> {
        self.ensure_free(function.name())?;
        self.functions
            .insert(function.name().to_string(), Arc::new(function));
        Ok(())
    }

    fn ensure_free(&self, name: &str) -> Result<()> {
        if self.types.contains_key(name) || self.functions.contains_key(name) {
            return Err(BridgeError::DuplicateRegistration {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Look up a registered type
    pub fn type_descriptor(&self, name: &str) -> Option<&Arc<TypeDescriptor>> {
        self.types.get(name)
    }

    /// Look up a registered free function
    pub fn function(&self, name: &str) -> Option<&Arc<NativeFunction>> {
        self.functions.get(name)
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered function names, sorted
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Base {
        hits: i32,
    }

    struct Derived {
        base: Base,
        label: String,
    }

    impl AsRef<Base> for Derived {
        fn as_ref(&self) -> &Base {
            &self.base
        }
    }

    impl AsMut<Base> for Derived {
        fn as_mut(&mut self) -> &mut Base {
            &mut self.base
        }
    }

    fn base_definition() -> TypeDefinition<Base> {
        TypeDefinition::<Base>::new("Base")
            .method("hit", |this: &mut Base, (): ()| {
                this.hits += 1;
                Ok(this.hits)
            })
            .readonly_property("hits", |this: &Base| this.hits)
            .method("label", |_this: &mut Base, (): ()| Ok("base"))
    }

    #[test]
    fn test_signature_arity() {
        let sig = Signature::fixed(vec![Shape::Int32, Shape::optional(Shape::String)]);
        assert_eq!(sig.required(), 1);
        assert!(sig.check("f", 1).is_ok());
        assert!(sig.check("f", 2).is_ok());
        assert!(sig.check("f", 0).is_err());
        assert!(sig.check("f", 3).is_err());

        let variadic = Signature::variadic(Vec::new());
        assert!(variadic.check("log", 7).is_ok());
    }

    #[test]
    fn test_arity_message() {
        let sig = Signature::fixed(vec![Shape::Int32]);
        let err = sig.check("MyObject", 2).unwrap_err();
        assert_eq!(err.to_string(), "'MyObject' expects 1 argument(s), got 2");
    }

    #[test]
    fn test_inherit_flattens_members() {
        let derived = TypeDefinition::<Derived>::new("Derived")
            .method("label", |this: &mut Derived, (): ()| Ok(this.label.clone()))
            .inherit(&base_definition())
            .into_descriptor("Derived".into());

        let table = derived.methods();
        assert_eq!(table.method_names(), vec!["hit", "label"]);
        assert_eq!(table.property_names(), vec!["hits"]);

        let mut state = Derived {
            base: Base { hits: 0 },
            label: "derived".into(),
        };
        let hit = table.method("hit").unwrap();
        (hit.call)(&mut state, &[]).unwrap();
        let hits = (table.property("hits").unwrap().getter)(&state).unwrap();
        assert_eq!(hits, MarshaledValue::Int32(1));

        // Derived definition wins over the base member of the same name
        let label = (table.method("label").unwrap().call)(&mut state, &[]).unwrap();
        assert_eq!(label, MarshaledValue::String("derived".into()));
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = TypeRegistry::default();
        registry
            .register_type(base_definition().into_descriptor("Base".into()))
            .unwrap();
        let err = registry
            .register_type(base_definition().into_descriptor("Base".into()))
            .unwrap_err();
        assert!(matches!(err, BridgeError::DuplicateRegistration { .. }));

        let err = registry
            .register_function(NativeFunction::new("Base", |_: &Bridge, (): ()| Ok(())))
            .unwrap_err();
        assert!(matches!(err, BridgeError::DuplicateRegistration { .. }));
    }

    #[test]
    fn test_module_qualifies_names() {
        let module = Module::new("file")
            .with_type(base_definition())
            .with_function(NativeFunction::new("rename", |_: &Bridge, (): ()| Ok(true)));
        let (types, functions) = module.into_parts();
        assert_eq!(types[0].name(), "file.Base");
        assert_eq!(functions[0].name(), "file.rename");
    }

    #[test]
    fn test_definition_without_constructor() {
        let descriptor = base_definition().into_descriptor("Base".into());
        assert!(!descriptor.is_constructible());
    }
}
