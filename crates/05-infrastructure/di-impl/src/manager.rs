//! 默认组件管理器
//!
//! 组件注册表和解析流程的中心：加载元数据生成组件、预先校验全部注入点、
//! 按作用域获取或创建实例，关闭时销毁全部作用域中的实例。

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use di_abstractions::{
    downcast_instance, instance, BeanId, BeanOwner, DefaultElementManager, ElementManager,
    InjectionPoint, Instance, MetaClass, MetaMethod, OwnerKind, Qualifiers, ScopeType,
    TypeDescriptor, Variable, BEAN, INJECTION_POINT, OPTIONAL, PROVIDER,
};
use infrastructure_common::{BeanManagerConfig, InjectionError, InjectionResult};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::bean::{Bean, BeanKind, SystemBean, SystemKind};
use crate::context::InitializationContext;
use crate::injection_target::InjectionTarget;
use crate::injector::Injector;
use crate::producer::{Disposer, ProducerFactory, ProducerMember};
use crate::scope::{DependentScopeContext, ScopeContext, SingletonScopeContext};

const OPEN: u8 = 0;
const CLOSING: u8 = 1;
const CLOSED: u8 = 2;

/// 已登记的销毁方法
struct DisposesMethod {
    variable: Variable,
    declaring_class: TypeDescriptor,
    method: Arc<MetaMethod>,
}

/// 默认组件管理器
pub struct DefaultBeanManager {
    self_ref: Weak<DefaultBeanManager>,
    config: BeanManagerConfig,
    element_manager: Arc<dyn ElementManager>,
    next_bean_id: AtomicU64,
    enabled_beans: DashMap<BeanId, Arc<Bean>>,
    shared_beans: DashMap<BeanId, Arc<Bean>>,
    beans_by_type: DashMap<TypeDescriptor, Vec<Arc<Bean>>>,
    disposes_methods: Mutex<Vec<DisposesMethod>>,
    scopes: RwLock<Vec<Arc<dyn ScopeContext>>>,
    synthetic_lock: Mutex<()>,
    state: AtomicU8,
}

impl DefaultBeanManager {
    /// 使用默认配置创建
    pub fn new() -> Arc<Self> {
        Self::with_config(BeanManagerConfig::default())
    }

    pub fn with_config(config: BeanManagerConfig) -> Arc<Self> {
        Self::with_element_manager(config, Arc::new(DefaultElementManager::new()))
    }

    /// 使用自定义元素管理器创建
    pub fn with_element_manager(
        config: BeanManagerConfig,
        element_manager: Arc<dyn ElementManager>,
    ) -> Arc<Self> {
        let mut scopes: Vec<Arc<dyn ScopeContext>> = vec![
            Arc::new(DependentScopeContext::new()),
            Arc::new(SingletonScopeContext::new()),
        ];
        scopes.extend(config.scopes.iter().map(|name| {
            Arc::new(SingletonScopeContext::with_scope_type(ScopeType::new(name.clone())))
                as Arc<dyn ScopeContext>
        }));
        info!("创建组件管理器, 作用域数量: {}", scopes.len());

        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            config,
            element_manager,
            next_bean_id: AtomicU64::new(1),
            enabled_beans: DashMap::new(),
            shared_beans: DashMap::new(),
            beans_by_type: DashMap::new(),
            disposes_methods: Mutex::new(Vec::new()),
            scopes: RwLock::new(scopes),
            synthetic_lock: Mutex::new(()),
            state: AtomicU8::new(OPEN),
        })
    }

    pub fn config(&self) -> &BeanManagerConfig {
        &self.config
    }

    fn ensure_open(&self) -> InjectionResult<()> {
        if self.state.load(Ordering::Acquire) == CLOSED {
            return Err(InjectionError::ManagerClosed);
        }
        Ok(())
    }

    fn next_id(&self) -> BeanId {
        BeanId(self.next_bean_id.fetch_add(1, Ordering::Relaxed))
    }

    fn injector(&self) -> Injector {
        Injector::new(self.self_ref.clone())
    }

    /// 注册作用域上下文，同名作用域以后注册的为准
    pub fn register_scope_context(&self, context: Arc<dyn ScopeContext>) {
        info!("注册作用域上下文: {}", context.scope_type());
        self.scopes.write().push(context);
    }

    /// 查找作用域上下文
    pub fn scope_context(&self, scope: &ScopeType) -> InjectionResult<Arc<dyn ScopeContext>> {
        self.scopes
            .read()
            .iter()
            .rev()
            .find(|c| c.scope_type() == scope)
            .cloned()
            .ok_or_else(|| InjectionError::UnknownScope {
                scope: scope.name().to_string(),
            })
    }

    // ---- 加载 ----

    /// 加载类的元数据，返回新创建的组件；启用校验时聚合报告全部校验错误
    pub fn load_beans<I>(&self, classes: I) -> InjectionResult<Vec<Arc<Bean>>>
    where
        I: IntoIterator<Item = Arc<MetaClass>>,
    {
        self.ensure_open()?;
        let mut loaded = Vec::new();
        for class in classes {
            let declaring_bean = if self.element_manager.is_injectable(&class) {
                Some(self.create_injection_target_bean(&class)?)
            } else {
                None
            };
            self.load_disposer_methods(&class);
            for bean in self.load_producer_beans(&class, declaring_bean.as_ref())? {
                self.add_bean(&bean);
                loaded.push(bean);
            }
            if let Some(bean) = declaring_bean {
                self.add_bean(&bean);
                loaded.push(bean);
            }
        }

        if self.config.enable_validation {
            self.validate_beans(&loaded)?;
        }
        info!("加载了 {} 个组件", loaded.len());
        Ok(loaded)
    }

    fn create_injection_target_bean(&self, class: &Arc<MetaClass>) -> InjectionResult<Arc<Bean>> {
        let constructor = self.element_manager.injectable_constructor(class)?;
        let id = self.next_id();
        let variable = self.element_manager.create_variable(&class.element, None);
        let owner = BeanOwner {
            id,
            scope: variable.scope().clone(),
            declared_type: class.class_type().clone(),
            kind: OwnerKind::InjectionTarget,
        };
        let points = self
            .element_manager
            .create_injection_points(class, &constructor, &owner);
        let target = InjectionTarget::new(Arc::clone(class), constructor, self.injector());
        Ok(Arc::new(Bean::new(
            id,
            variable,
            Some(class.class_type().clone()),
            points,
            BeanKind::InjectionTarget(target),
        )))
    }

    fn load_disposer_methods(&self, class: &MetaClass) {
        let mut disposes_methods = self.disposes_methods.lock();
        for method in &class.methods {
            if let Some(parameter) = method.disposes_parameter() {
                debug!("登记销毁方法 {}", method);
                disposes_methods.push(DisposesMethod {
                    variable: self.element_manager.create_variable(&parameter.element, None),
                    declaring_class: class.class_type().clone(),
                    method: Arc::clone(method),
                });
            }
        }
    }

    fn load_producer_beans(
        &self,
        class: &MetaClass,
        declaring_bean: Option<&Arc<Bean>>,
    ) -> InjectionResult<Vec<Arc<Bean>>> {
        let fields = class
            .fields
            .iter()
            .filter(|f| f.element.annotations.producer)
            .map(|f| ProducerMember::Field(Arc::clone(f)));
        let methods = class
            .methods
            .iter()
            .filter(|m| m.element.annotations.producer)
            .map(|m| ProducerMember::Method(Arc::clone(m)));

        fields
            .chain(methods)
            .map(|member| self.create_producer_bean(class, declaring_bean, member))
            .collect()
    }

    fn create_producer_bean(
        &self,
        class: &MetaClass,
        declaring_bean: Option<&Arc<Bean>>,
        member: ProducerMember,
    ) -> InjectionResult<Arc<Bean>> {
        let id = self.next_id();
        let variable = self
            .element_manager
            .create_variable(member.element(), class.element.scope.as_ref());
        let owner = BeanOwner {
            id,
            scope: variable.scope().clone(),
            declared_type: member.element().base_type.clone(),
            kind: OwnerKind::Producer,
        };
        let points = match &member {
            ProducerMember::Method(method) => self
                .element_manager
                .create_executable_injection_points(method, Some(&owner)),
            ProducerMember::Field(_) => Vec::new(),
        };
        let disposer = self
            .resolve_disposer_method(&variable, class.class_type())?
            .map(|method| {
                let points = self
                    .element_manager
                    .create_executable_injection_points(&method, Some(&owner));
                Disposer::new(method, points)
            });
        let factory =
            ProducerFactory::new(declaring_bean.cloned(), member, disposer, self.injector())?;
        Ok(Arc::new(Bean::new(
            id,
            variable,
            Some(class.class_type().clone()),
            points,
            BeanKind::Producer(factory),
        )))
    }

    /// 同一声明类中类型和限定符都匹配的销毁方法，多于一个时报错
    fn resolve_disposer_method(
        &self,
        variable: &Variable,
        declaring_class: &TypeDescriptor,
    ) -> InjectionResult<Option<Arc<MetaMethod>>> {
        let disposes_methods = self.disposes_methods.lock();
        let mut matching: Vec<&DisposesMethod> = disposes_methods
            .iter()
            .filter(|d| {
                d.declaring_class == *declaring_class
                    && d.variable
                        .declared_type()
                        .is_some_and(|t| variable.has_matching_type(t))
                    && d.variable.qualifiers() == variable.qualifiers()
            })
            .collect();
        match matching.len() {
            0 => Ok(None),
            1 => Ok(matching.pop().map(|d| Arc::clone(&d.method))),
            _ => Err(InjectionError::AmbiguousDisposer {
                variable: variable.to_string(),
                methods: matching.iter().map(|d| d.method.to_string()).collect(),
            }),
        }
    }

    fn add_bean(&self, bean: &Arc<Bean>) {
        debug!("注册组件 {}", bean);
        self.enabled_beans.insert(bean.id(), Arc::clone(bean));
        if !bean.is_dependent_scoped() && !bean.is_system() {
            self.shared_beans.insert(bean.id(), Arc::clone(bean));
        }
        for ty in bean.types() {
            for key in ty.index_keys() {
                let mut entry = self.beans_by_type.entry(key).or_default();
                if !entry.iter().any(|b| b.id() == bean.id()) {
                    entry.push(Arc::clone(bean));
                }
            }
        }
    }

    // ---- 校验 ----

    /// 校验全部组件的注入点，聚合所有错误
    pub fn validate_beans(&self, beans: &[Arc<Bean>]) -> InjectionResult<()> {
        let errors: Vec<InjectionError> = beans
            .iter()
            .flat_map(|bean| bean.all_injection_points())
            .filter_map(|point| self.validate_injection_point(point).err())
            .collect();
        if errors.is_empty() {
            return Ok(());
        }
        for e in &errors {
            error!("组件校验失败: {}", e);
        }
        Err(InjectionError::ValidationFailed { errors })
    }

    /// 校验单个注入点
    pub fn validate_injection_point(&self, point: &InjectionPoint) -> InjectionResult<()> {
        if point.element.is_producer() {
            return Err(InjectionError::definition(format!(
                "不能注入到 @Produces 元素: {point}"
            )));
        }
        let ty = &point.required_type;
        if ty.is_type_variable() {
            return Err(InjectionError::definition(format!(
                "不能注入到类型变量: {point}"
            )));
        }
        if ty.has_raw_name(INJECTION_POINT) {
            let Some(owner) = &point.owner else {
                return Err(InjectionError::definition(format!(
                    "不能把 InjectionPoint 注入到非组件: {point}"
                )));
            };
            if !owner.is_dependent_scoped() {
                return Err(InjectionError::definition(format!(
                    "InjectionPoint 只能注入到 @Dependent 组件: {point}"
                )));
            }
            return Ok(());
        }
        if ty.has_raw_name(BEAN) {
            let matches_owner = match (ty.single_argument_of(BEAN), &point.owner) {
                (Some(argument), Some(owner)) => *argument == owner.declared_type,
                _ => false,
            };
            if !matches_owner || !point.qualifiers.has_default_qualifier() {
                return Err(InjectionError::definition(format!(
                    "Bean<T> 注入点的类型参数必须是所属组件的类型: {point}"
                )));
            }
            return Ok(());
        }
        match self.resolve_injection_point(point)? {
            Some(_) => Ok(()),
            None if ty.has_raw_name(OPTIONAL) => Ok(()),
            None => Err(InjectionError::unsatisfied(point)),
        }
    }

    // ---- 解析 ----

    fn beans_matching_type(&self, ty: &TypeDescriptor) -> Vec<Arc<Bean>> {
        if let Some(exact) = self.beans_by_type.get(ty) {
            if !exact.is_empty() {
                return exact.value().clone();
            }
        }
        let fallback = ty.raw_type().unwrap_or_else(|| ty.reference_type());
        if fallback == *ty {
            return Vec::new();
        }
        self.beans_by_type
            .get(&fallback)
            .map(|beans| {
                beans
                    .iter()
                    .filter(|b| b.variable().has_matching_type(ty))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 按类型和限定符查找组件，多于一个时报歧义错误
    pub fn get_bean(
        &self,
        ty: &TypeDescriptor,
        qualifiers: &Qualifiers,
    ) -> InjectionResult<Option<Arc<Bean>>> {
        let mut matching: Vec<Arc<Bean>> = self
            .beans_matching_type(ty)
            .into_iter()
            .filter(|b| b.qualifiers() == qualifiers)
            .collect();
        match matching.len() {
            0 | 1 => Ok(matching.pop()),
            _ => Err(InjectionError::AmbiguousBean {
                description: format!("{qualifiers} {ty}"),
                candidates: matching.iter().map(ToString::to_string).collect(),
            }),
        }
    }

    /// 按类型查找默认限定符的组件
    pub fn get_default_bean(&self, ty: &TypeDescriptor) -> InjectionResult<Option<Arc<Bean>>> {
        self.get_bean(ty, &Qualifiers::none())
    }

    /// 解析注入点对应的组件，需要时合成系统组件
    pub fn resolve_injection_point(
        &self,
        point: &InjectionPoint,
    ) -> InjectionResult<Option<Arc<Bean>>> {
        self.resolve(&point.required_type, &point.qualifiers)
    }

    /// 已有组件，或者为 `Provider<T>`、`Optional<T>` 以及有提供者的 `T` 合成的组件
    pub fn resolve(
        &self,
        ty: &TypeDescriptor,
        qualifiers: &Qualifiers,
    ) -> InjectionResult<Option<Arc<Bean>>> {
        if let Some(bean) = self.get_bean(ty, qualifiers)? {
            return Ok(Some(bean));
        }
        if let Some(target) = ty.single_argument_of(PROVIDER) {
            if self.resolve(target, qualifiers)?.is_none() {
                return Ok(None);
            }
            let kind = SystemKind::Provider {
                target: target.clone(),
                qualifiers: qualifiers.clone(),
            };
            return self.synthesize(ty, qualifiers, kind).map(Some);
        }
        if let Some(target) = ty.single_argument_of(OPTIONAL) {
            let kind = SystemKind::Optional {
                target: target.clone(),
                qualifiers: qualifiers.clone(),
            };
            return self.synthesize(ty, qualifiers, kind).map(Some);
        }
        if ty.has_raw_name(PROVIDER) || ty.has_raw_name(OPTIONAL) {
            return Ok(None);
        }
        let provider_type = TypeDescriptor::provider_of(ty.clone());
        match self.get_bean(&provider_type, qualifiers)? {
            Some(provider_bean) => self
                .synthesize(ty, qualifiers, SystemKind::Provided { provider_bean })
                .map(Some),
            None => Ok(None),
        }
    }

    fn synthesize(
        &self,
        ty: &TypeDescriptor,
        qualifiers: &Qualifiers,
        kind: SystemKind,
    ) -> InjectionResult<Arc<Bean>> {
        let _lock = self.synthetic_lock.lock();
        if let Some(existing) = self.get_bean(ty, qualifiers)? {
            return Ok(existing);
        }
        let variable = Variable::new(
            ty.to_string(),
            vec![ty.clone()],
            qualifiers.clone(),
            ScopeType::DEPENDENT,
        );
        let system = SystemBean::new(kind, self.self_ref.clone());
        let bean = Arc::new(Bean::new(
            self.next_id(),
            variable,
            None,
            Vec::new(),
            BeanKind::System(system),
        ));
        self.add_bean(&bean);
        Ok(bean)
    }

    // ---- 取值 ----

    /// 创建根初始化上下文
    pub fn create_initialization_context(&self, bean: Option<Arc<Bean>>) -> InitializationContext {
        InitializationContext::new(bean)
    }

    /// 通过组件作用域获取或创建实例
    pub fn get_value(
        &self,
        bean: &Arc<Bean>,
        parent: &InitializationContext,
    ) -> InjectionResult<Instance> {
        self.get_value_through(bean, parent, None)
    }

    /// 获取实例并转换为具体类型
    pub fn get_value_as<T: Any + Send + Sync>(
        &self,
        bean: &Arc<Bean>,
        parent: &InitializationContext,
    ) -> InjectionResult<Arc<T>> {
        downcast_instance(&self.get_value(bean, parent)?)
    }

    fn get_value_through(
        &self,
        bean: &Arc<Bean>,
        parent: &InitializationContext,
        point: Option<&InjectionPoint>,
    ) -> InjectionResult<Instance> {
        self.ensure_open()?;
        if parent.is_under_construction(bean.id()) {
            if let Some(incomplete) = parent.incomplete_instance(bean.id()) {
                return Ok(incomplete);
            }
            return Err(InjectionError::CircularDependency {
                chain: parent.construction_chain(bean),
            });
        }
        if parent.depth() >= self.config.max_resolution_depth {
            return Err(InjectionError::ResolutionDepthExceeded {
                bean: bean.to_string(),
                max_depth: self.config.max_resolution_depth,
            });
        }
        let scope = self.scope_context(bean.scope())?;
        let context = parent.create_dependent_context(Arc::clone(bean), point.cloned());
        scope.get_or_create(bean, context)
    }

    /// 获取注入点的值
    pub fn get_injectable_value(
        &self,
        point: &InjectionPoint,
        parent: &InitializationContext,
    ) -> InjectionResult<Instance> {
        let ty = &point.required_type;
        if ty.has_raw_name(INJECTION_POINT) {
            return parent
                .injection_point()
                .map(|p| instance(p.clone()))
                .ok_or_else(|| InjectionError::unsatisfied(point));
        }
        if ty.has_raw_name(BEAN) {
            return parent
                .bean()
                .map(|b| instance(Arc::clone(b)))
                .ok_or_else(|| InjectionError::unsatisfied(point));
        }

        let resolved = self
            .resolve_injection_point(point)?
            .ok_or_else(|| InjectionError::unsatisfied(point))?;

        if let Some(owner) = point.owner.as_ref().filter(|o| o.id != resolved.id()) {
            if let Some(existing) = self.existing_value(&resolved, owner, parent) {
                return Ok(existing);
            }
        }

        if resolved.is_dependent_scoped() {
            self.get_value_through(&resolved, parent, Some(point))
        } else {
            let root = parent.linked_root(Some(Arc::clone(&resolved)));
            self.get_value_through(&resolved, &root, Some(point))
        }
    }

    fn existing_value(
        &self,
        resolved: &Arc<Bean>,
        owner: &BeanOwner,
        parent: &InitializationContext,
    ) -> Option<Instance> {
        if owner.is_dependent_scoped() && parent.non_dependent_bean().is_none() {
            return None;
        }
        parent.incomplete_instance(resolved.id()).or_else(|| {
            self.scope_context(resolved.scope())
                .ok()?
                .get_if_exists(resolved)
        })
    }

    /// `Provider<T>` 每次 `get` 时的解析，`context` 是提供者组件的创建上下文
    pub(crate) fn provide(
        &self,
        ty: &TypeDescriptor,
        qualifiers: &Qualifiers,
        context: &InitializationContext,
    ) -> InjectionResult<Instance> {
        let bean = self.resolve(ty, qualifiers)?.ok_or_else(|| {
            InjectionError::unsatisfied(format!("{qualifiers} {ty}"))
        })?;
        let context = context.fork();
        if bean.is_dependent_scoped() {
            self.get_value(&bean, &context)
        } else {
            self.get_value(&bean, &context.linked_root(Some(Arc::clone(&bean))))
        }
    }

    // ---- 查询 ----

    /// 全部已注册组件，按注册顺序
    pub fn beans(&self) -> Vec<Arc<Bean>> {
        Self::sorted(&self.enabled_beans)
    }

    /// 非依赖作用域的用户组件
    pub fn shared_beans(&self) -> Vec<Arc<Bean>> {
        Self::sorted(&self.shared_beans)
    }

    fn sorted(beans: &DashMap<BeanId, Arc<Bean>>) -> Vec<Arc<Bean>> {
        let mut beans: Vec<Arc<Bean>> = beans.iter().map(|e| Arc::clone(e.value())).collect();
        beans.sort_by_key(|b| b.id());
        beans
    }

    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) == CLOSED
    }

    /// 按注册的逆序关闭作用域，然后清空注册表
    pub fn close(&self) {
        if self
            .state
            .compare_exchange(OPEN, CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("组件管理器已经关闭");
            return;
        }
        let scopes: Vec<Arc<dyn ScopeContext>> = self.scopes.read().clone();
        for scope in scopes.iter().rev() {
            scope.close();
        }
        self.state.store(CLOSED, Ordering::Release);

        let count = self.enabled_beans.len();
        self.scopes.write().clear();
        self.beans_by_type.clear();
        self.enabled_beans.clear();
        self.shared_beans.clear();
        self.disposes_methods.lock().clear();
        info!("组件管理器已关闭, 清理了 {} 个组件", count);
    }
}

impl fmt::Debug for DefaultBeanManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultBeanManager")
            .field("config", &self.config)
            .field("beans", &self.enabled_beans.len())
            .field("shared_beans", &self.shared_beans.len())
            .field("scopes", &self.scopes.read().len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
