//! 元数据模型
//!
//! 描述类、字段、方法、构造器和参数。元数据由外部的内省适配层提供，
//! 注解以预先计算好的标志位表示，实际调用委托给适配层提供的闭包。

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use infrastructure_common::{BoxError, InjectionError, InjectionResult};

use crate::qualifiers::Qualifiers;
use crate::scope::ScopeType;
use crate::types::{type_closure, TypeDescriptor};

/// 组件实例
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 构造器调用闭包
pub type ConstructorInvoker = Arc<dyn Fn(Arguments) -> Result<Instance, BoxError> + Send + Sync>;

/// 方法调用闭包，静态方法的接收者为 `None`，无返回值时返回 `None`
pub type MethodInvoker =
    Arc<dyn Fn(Option<&Instance>, Arguments) -> Result<Option<Instance>, BoxError> + Send + Sync>;

/// 字段读取闭包
pub type FieldGetter = Arc<dyn Fn(Option<&Instance>) -> Result<Instance, BoxError> + Send + Sync>;

/// 字段写入闭包
pub type FieldSetter = Arc<dyn Fn(Option<&Instance>, Instance) -> Result<(), BoxError> + Send + Sync>;

/// 将值包装为组件实例
pub fn instance<T: Any + Send + Sync>(value: T) -> Instance {
    Arc::new(value)
}

/// 将组件实例转换为具体类型
pub fn downcast_instance<T: Any + Send + Sync>(instance: &Instance) -> InjectionResult<Arc<T>> {
    Arc::clone(instance)
        .downcast::<T>()
        .map_err(|_| InjectionError::type_mismatch(std::any::type_name::<T>()))
}

/// 调用参数，按参数声明顺序排列
///
/// `Optional<T>` 参数的值是 `Option<Instance>`，`Provider<T>` 参数的值是 [`crate::Provider`]。
#[derive(Clone, Default)]
pub struct Arguments(Vec<Instance>);

impl Arguments {
    pub fn new(values: Vec<Instance>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 获取原始实例
    pub fn instance(&self, index: usize) -> InjectionResult<&Instance> {
        self.0.get(index).ok_or_else(|| {
            InjectionError::definition(format!("参数下标越界: {index} (共 {} 个)", self.0.len()))
        })
    }

    /// 获取指定类型的参数
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> InjectionResult<Arc<T>> {
        downcast_instance(self.instance(index)?)
    }

    /// 获取 `Optional<T>` 参数
    pub fn optional<T: Any + Send + Sync>(&self, index: usize) -> InjectionResult<Option<Arc<T>>> {
        match &*self.get::<Option<Instance>>(index)? {
            Some(value) => downcast_instance(value).map(Some),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments").field("len", &self.0.len()).finish()
    }
}

/// 注解标志位
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Annotations {
    /// `@Inject`
    pub injectable: bool,
    /// `@Produces`
    pub producer: bool,
    /// `@Disposes`（参数）
    pub disposer_target: bool,
    /// `@PostConstruct`
    pub post_construct: bool,
    /// `@PreDestroy`
    pub pre_destroy: bool,
    /// 实现 `Provider::get` 的无参方法
    pub supplier: bool,
}

/// 元素的公共信息
#[derive(Debug, Clone)]
pub struct ElementInfo {
    pub name: String,
    pub base_type: TypeDescriptor,
    pub type_closure: Vec<TypeDescriptor>,
    pub qualifiers: Qualifiers,
    pub scope: Option<ScopeType>,
    pub annotations: Annotations,
}

impl ElementInfo {
    pub fn new(name: impl Into<String>, base_type: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            type_closure: vec![base_type.clone()],
            base_type,
            qualifiers: Qualifiers::none(),
            scope: None,
            annotations: Annotations::default(),
        }
    }

    fn set_supertypes(&mut self, supertypes: &[TypeDescriptor]) {
        self.type_closure = type_closure(&self.base_type, supertypes);
    }
}

macro_rules! element_builders {
    ($ty:ty) => {
        impl $ty {
            /// 设置限定符
            pub fn with_qualifiers(mut self, qualifiers: Qualifiers) -> Self {
                self.element.qualifiers = qualifiers;
                self
            }

            /// 设置作用域
            pub fn with_scope(mut self, scope: ScopeType) -> Self {
                self.element.scope = Some(scope);
                self
            }

            /// 设置超类型，类型闭包为基础类型加超类型
            pub fn with_supertypes(mut self, supertypes: &[TypeDescriptor]) -> Self {
                self.element.set_supertypes(supertypes);
                self
            }

            /// 元素公共信息
            pub fn element(&self) -> &ElementInfo {
                &self.element
            }

            /// 元素名称
            pub fn name(&self) -> &str {
                &self.element.name
            }

            /// 注解标志位
            pub fn annotations(&self) -> Annotations {
                self.element.annotations
            }
        }
    };
}

/// 参数
#[derive(Debug, Clone)]
pub struct MetaParameter {
    pub index: usize,
    pub element: ElementInfo,
}

impl MetaParameter {
    pub fn new(name: impl Into<String>, parameter_type: TypeDescriptor) -> Self {
        Self {
            index: 0,
            element: ElementInfo::new(name, parameter_type),
        }
    }

    /// 标记为 `@Disposes` 参数
    pub fn disposes(mut self) -> Self {
        self.element.annotations.disposer_target = true;
        self
    }
}

element_builders!(MetaParameter);

/// 字段
pub struct MetaField {
    pub element: ElementInfo,
    pub declaring_class: TypeDescriptor,
    pub is_static: bool,
    getter: Option<FieldGetter>,
    setter: Option<FieldSetter>,
}

impl MetaField {
    pub fn new(name: impl Into<String>, field_type: TypeDescriptor) -> Self {
        Self {
            element: ElementInfo::new(name, field_type),
            declaring_class: TypeDescriptor::unit(),
            is_static: false,
            getter: None,
            setter: None,
        }
    }

    pub fn with_getter<F>(mut self, getter: F) -> Self
    where
        F: Fn(Option<&Instance>) -> Result<Instance, BoxError> + Send + Sync + 'static,
    {
        self.getter = Some(Arc::new(getter));
        self
    }

    pub fn with_setter<F>(mut self, setter: F) -> Self
    where
        F: Fn(Option<&Instance>, Instance) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.setter = Some(Arc::new(setter));
        self
    }

    /// `@Inject`
    pub fn inject(mut self) -> Self {
        self.element.annotations.injectable = true;
        self
    }

    /// `@Produces`
    pub fn produces(mut self) -> Self {
        self.element.annotations.producer = true;
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// 读取字段值
    pub fn get(&self, receiver: Option<&Instance>) -> InjectionResult<Instance> {
        let getter = self
            .getter
            .as_ref()
            .ok_or_else(|| InjectionError::definition(format!("字段 {self} 不可读")))?;
        getter(receiver).map_err(|e| InjectionError::invocation(self, e))
    }

    /// 写入字段值
    pub fn set(&self, receiver: Option<&Instance>, value: Instance) -> InjectionResult<()> {
        let setter = self
            .setter
            .as_ref()
            .ok_or_else(|| InjectionError::definition(format!("字段 {self} 不可写")))?;
        setter(receiver, value).map_err(|e| InjectionError::invocation(self, e))
    }
}

element_builders!(MetaField);

impl fmt::Display for MetaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_class, self.element.name)
    }
}

impl fmt::Debug for MetaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaField")
            .field("element", &self.element)
            .field("declaring_class", &self.declaring_class)
            .field("is_static", &self.is_static)
            .field("getter", &self.getter.as_ref().map(|_| "<function>"))
            .field("setter", &self.setter.as_ref().map(|_| "<function>"))
            .finish()
    }
}

/// 方法，基础类型为返回类型
pub struct MetaMethod {
    pub element: ElementInfo,
    pub declaring_class: TypeDescriptor,
    pub is_static: bool,
    pub parameters: Vec<Arc<MetaParameter>>,
    invoker: MethodInvoker,
}

impl MetaMethod {
    pub fn new<F>(name: impl Into<String>, return_type: TypeDescriptor, invoker: F) -> Self
    where
        F: Fn(Option<&Instance>, Arguments) -> Result<Option<Instance>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            element: ElementInfo::new(name, return_type),
            declaring_class: TypeDescriptor::unit(),
            is_static: false,
            parameters: Vec::new(),
            invoker: Arc::new(invoker),
        }
    }

    /// 追加参数，参数下标按追加顺序分配
    pub fn with_parameter(mut self, mut parameter: MetaParameter) -> Self {
        parameter.index = self.parameters.len();
        self.parameters.push(Arc::new(parameter));
        self
    }

    /// `@Inject`
    pub fn inject(mut self) -> Self {
        self.element.annotations.injectable = true;
        self
    }

    /// `@Produces`
    pub fn produces(mut self) -> Self {
        self.element.annotations.producer = true;
        self
    }

    /// `@PostConstruct`
    pub fn post_construct(mut self) -> Self {
        self.element.annotations.post_construct = true;
        self
    }

    /// `@PreDestroy`
    pub fn pre_destroy(mut self) -> Self {
        self.element.annotations.pre_destroy = true;
        self
    }

    /// 标记为 `Provider::get` 的实现
    pub fn supplier(mut self) -> Self {
        self.element.annotations.supplier = true;
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// `@Disposes` 参数
    pub fn disposes_parameter(&self) -> Option<&Arc<MetaParameter>> {
        self.parameters
            .iter()
            .find(|p| p.element.annotations.disposer_target)
    }

    /// 调用方法
    pub fn invoke(
        &self,
        receiver: Option<&Instance>,
        arguments: Arguments,
    ) -> InjectionResult<Option<Instance>> {
        (self.invoker)(receiver, arguments).map_err(|e| InjectionError::invocation(self, e))
    }
}

element_builders!(MetaMethod);

impl fmt::Display for MetaMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}()", self.declaring_class, self.element.name)
    }
}

impl fmt::Debug for MetaMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaMethod")
            .field("element", &self.element)
            .field("declaring_class", &self.declaring_class)
            .field("is_static", &self.is_static)
            .field("parameters", &self.parameters)
            .field("invoker", &"<function>")
            .finish()
    }
}

/// 构造器
pub struct MetaConstructor {
    pub declaring_class: TypeDescriptor,
    pub annotations: Annotations,
    pub parameters: Vec<Arc<MetaParameter>>,
    invoker: ConstructorInvoker,
}

impl MetaConstructor {
    pub fn new<F>(invoker: F) -> Self
    where
        F: Fn(Arguments) -> Result<Instance, BoxError> + Send + Sync + 'static,
    {
        Self {
            declaring_class: TypeDescriptor::unit(),
            annotations: Annotations::default(),
            parameters: Vec::new(),
            invoker: Arc::new(invoker),
        }
    }

    /// 调用 `T::default()` 的无参构造器
    pub fn default_of<T: Default + Any + Send + Sync>() -> Self {
        Self::new(|_| Ok(instance(T::default())))
    }

    pub fn with_parameter(mut self, mut parameter: MetaParameter) -> Self {
        parameter.index = self.parameters.len();
        self.parameters.push(Arc::new(parameter));
        self
    }

    /// `@Inject`
    pub fn inject(mut self) -> Self {
        self.annotations.injectable = true;
        self
    }

    /// 调用构造器
    pub fn invoke(&self, arguments: Arguments) -> InjectionResult<Instance> {
        (self.invoker)(arguments).map_err(|e| InjectionError::invocation(self, e))
    }
}

impl fmt::Display for MetaConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::new/{}", self.declaring_class, self.parameters.len())
    }
}

impl fmt::Debug for MetaConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaConstructor")
            .field("declaring_class", &self.declaring_class)
            .field("annotations", &self.annotations)
            .field("parameters", &self.parameters)
            .field("invoker", &"<function>")
            .finish()
    }
}

/// 类
#[derive(Debug)]
pub struct MetaClass {
    pub element: ElementInfo,
    pub is_abstract: bool,
    pub constructors: Vec<Arc<MetaConstructor>>,
    pub fields: Vec<Arc<MetaField>>,
    pub methods: Vec<Arc<MetaMethod>>,
}

impl MetaClass {
    pub fn new(class_type: TypeDescriptor) -> Self {
        let name = class_type.to_string();
        Self {
            element: ElementInfo::new(name, class_type),
            is_abstract: false,
            constructors: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// 以 Rust 类型创建
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeDescriptor::of::<T>())
    }

    pub fn class_type(&self) -> &TypeDescriptor {
        &self.element.base_type
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn with_constructor(mut self, mut constructor: MetaConstructor) -> Self {
        constructor.declaring_class = self.element.base_type.clone();
        self.constructors.push(Arc::new(constructor));
        self
    }

    pub fn with_field(mut self, mut field: MetaField) -> Self {
        field.declaring_class = self.element.base_type.clone();
        self.fields.push(Arc::new(field));
        self
    }

    pub fn with_method(mut self, mut method: MetaMethod) -> Self {
        method.declaring_class = self.element.base_type.clone();
        self.methods.push(Arc::new(method));
        self
    }

    /// 构造完成后按声明顺序调用的方法
    pub fn post_construct_methods(&self) -> Vec<Arc<MetaMethod>> {
        self.methods_where(|a| a.post_construct)
    }

    /// 销毁前按声明顺序调用的方法
    pub fn pre_destroy_methods(&self) -> Vec<Arc<MetaMethod>> {
        self.methods_where(|a| a.pre_destroy)
    }

    fn methods_where(&self, predicate: impl Fn(&Annotations) -> bool) -> Vec<Arc<MetaMethod>> {
        self.methods
            .iter()
            .filter(|m| predicate(&m.element.annotations))
            .cloned()
            .collect()
    }
}

element_builders!(MetaClass);

impl fmt::Display for MetaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.element.base_type)
    }
}
