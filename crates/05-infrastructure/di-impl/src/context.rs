//! 初始化上下文
//!
//! 一次解析过程的工作单元：记录构造中的不完整实例，跟踪本次创建的依赖作用域实例，
//! 关闭时级联销毁被跟踪的实例。

use std::fmt;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use di_abstractions::{BeanId, InjectionPoint, Instance};
use infrastructure_common::InjectionResult;
use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::bean::Bean;

/// 作用域中的实例：组件、实例和创建它的上下文
pub struct ScopedInstance {
    bean: Arc<Bean>,
    instance: Instance,
    context: InitializationContext,
    created_at: DateTime<Utc>,
}

impl ScopedInstance {
    pub fn new(bean: Arc<Bean>, instance: Instance, context: InitializationContext) -> Self {
        Self {
            bean,
            instance,
            context,
            created_at: Utc::now(),
        }
    }

    pub fn bean(&self) -> &Arc<Bean> {
        &self.bean
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn context(&self) -> &InitializationContext {
        &self.context
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 销毁实例并关闭其上下文
    pub fn destroy(&self) -> InjectionResult<()> {
        self.bean.destroy(&self.instance, &self.context)
    }
}

impl fmt::Debug for ScopedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedInstance")
            .field("bean", &self.bean.to_string())
            .field("context", &self.context.id())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// 同一条解析链共享的状态
#[derive(Default)]
struct ResolutionChain {
    incomplete: DashMap<BeanId, Instance>,
    constructing: Mutex<Vec<(BeanId, String)>>,
}

struct ContextInner {
    id: Uuid,
    bean: Option<Arc<Bean>>,
    chain: Arc<ResolutionChain>,
    parent: Option<Weak<ContextInner>>,
    non_dependent_bean: Option<Arc<Bean>>,
    injection_point: Option<InjectionPoint>,
    depth: usize,
    dependents: Arc<Mutex<Vec<ScopedInstance>>>,
}

/// 初始化上下文
#[derive(Clone)]
pub struct InitializationContext(Arc<ContextInner>);

impl InitializationContext {
    /// 创建根上下文
    pub fn new(bean: Option<Arc<Bean>>) -> Self {
        Self::from_parts(bean, Arc::default(), None, None, None, 0)
    }

    fn from_parts(
        bean: Option<Arc<Bean>>,
        chain: Arc<ResolutionChain>,
        parent: Option<Weak<ContextInner>>,
        non_dependent_bean: Option<Arc<Bean>>,
        injection_point: Option<InjectionPoint>,
        depth: usize,
    ) -> Self {
        Self(Arc::new(ContextInner {
            id: Uuid::new_v4(),
            bean,
            chain,
            parent,
            non_dependent_bean,
            injection_point,
            depth,
            dependents: Arc::default(),
        }))
    }

    pub fn id(&self) -> Uuid {
        self.0.id
    }

    /// 上下文所属组件
    pub fn bean(&self) -> Option<&Arc<Bean>> {
        self.0.bean.as_ref()
    }

    /// 嵌套深度
    pub fn depth(&self) -> usize {
        self.0.depth
    }

    /// 所属组件被注入时经过的注入点
    pub fn injection_point(&self) -> Option<&InjectionPoint> {
        self.0.injection_point.as_ref()
    }

    /// 链上最近的非依赖作用域组件，根上下文没有
    pub fn non_dependent_bean(&self) -> Option<&Arc<Bean>> {
        self.0.parent.as_ref()?;
        self.0.non_dependent_bean.as_ref()
    }

    /// 为 `bean` 创建子上下文，共享不完整实例
    pub fn create_dependent_context(
        &self,
        bean: Arc<Bean>,
        injection_point: Option<InjectionPoint>,
    ) -> Self {
        let non_dependent_bean = match &self.0.bean {
            Some(own) if !own.is_dependent_scoped() => Some(Arc::clone(own)),
            _ => self.0.non_dependent_bean.clone(),
        };
        Self::from_parts(
            Some(bean),
            Arc::clone(&self.0.chain),
            Some(Arc::downgrade(&self.0)),
            non_dependent_bean,
            injection_point,
            self.0.depth + 1,
        )
    }

    /// 创建新的根上下文，与本上下文共享解析链
    pub fn linked_root(&self, bean: Option<Arc<Bean>>) -> Self {
        Self::from_parts(
            bean,
            Arc::clone(&self.0.chain),
            None,
            None,
            None,
            self.0.depth + 1,
        )
    }

    /// 在新的解析链上复制本上下文，被跟踪的依赖实例仍登记到本上下文
    pub fn fork(&self) -> Self {
        Self(Arc::new(ContextInner {
            id: Uuid::new_v4(),
            bean: self.0.bean.clone(),
            chain: Arc::default(),
            parent: self.0.parent.clone(),
            non_dependent_bean: self.0.non_dependent_bean.clone(),
            injection_point: self.0.injection_point.clone(),
            depth: self.0.depth,
            dependents: Arc::clone(&self.0.dependents),
        }))
    }

    pub fn add_incomplete_instance(&self, bean: BeanId, instance: Instance) {
        self.0.chain.incomplete.insert(bean, instance);
    }

    pub fn remove_incomplete_instance(&self, bean: BeanId) {
        self.0.chain.incomplete.remove(&bean);
    }

    /// 构造中但尚未完成注入的实例
    pub fn incomplete_instance(&self, bean: BeanId) -> Option<Instance> {
        self.0.chain.incomplete.get(&bean).map(|e| Arc::clone(e.value()))
    }

    /// 组件是否正在本解析链上构造
    pub fn is_under_construction(&self, bean: BeanId) -> bool {
        self.0.chain.constructing.lock().iter().any(|(id, _)| *id == bean)
    }

    /// 标记组件开始构造，守卫释放时取消标记
    pub(crate) fn begin_construction(&self, bean: &Bean) -> ConstructionGuard {
        self.0
            .chain
            .constructing
            .lock()
            .push((bean.id(), bean.variable().to_string()));
        ConstructionGuard {
            chain: Arc::clone(&self.0.chain),
            bean: bean.id(),
        }
    }

    /// 从链首到 `next` 的构造路径描述
    pub fn construction_chain(&self, next: &Bean) -> String {
        let constructing = self.0.chain.constructing.lock();
        constructing
            .iter()
            .map(|(_, name)| name.clone())
            .chain(std::iter::once(next.variable().to_string()))
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// 本上下文是否需要跟踪 `bean` 的实例
    pub fn is_tracking_dependencies(&self, bean: &Bean) -> bool {
        !self.0.dependents.lock().is_empty() || bean.is_tracking_dependencies()
    }

    /// 把本上下文所属组件的实例登记到父上下文，父上下文关闭时销毁
    pub fn add_dependent_instance(&self, instance: Instance) {
        let (Some(bean), Some(parent)) = (&self.0.bean, &self.0.parent) else {
            return;
        };
        let Some(parent) = parent.upgrade() else {
            return;
        };
        debug!("上下文 {} 跟踪依赖实例 {}", parent.id, bean);
        parent
            .dependents
            .lock()
            .push(ScopedInstance::new(Arc::clone(bean), instance, self.clone()));
    }

    /// 被跟踪的依赖实例数量
    pub fn dependent_count(&self) -> usize {
        self.0.dependents.lock().len()
    }

    /// 关闭上下文，销毁被跟踪的依赖实例，跳过上下文自身的组件
    pub fn close(&self) {
        let dependents = std::mem::take(&mut *self.0.dependents.lock());
        if dependents.is_empty() {
            return;
        }
        debug!("关闭上下文 {}, 销毁 {} 个依赖实例", self.0.id, dependents.len());
        let own = self.0.bean.as_ref().map(|b| b.id());
        for dependent in dependents {
            if Some(dependent.bean().id()) == own {
                continue;
            }
            if let Err(e) = dependent.destroy() {
                warn!("销毁依赖实例 {} 失败: {}", dependent.bean(), e);
            }
        }
    }
}

impl fmt::Debug for InitializationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitializationContext")
            .field("id", &self.0.id)
            .field("bean", &self.0.bean.as_ref().map(|b| b.to_string()))
            .field("depth", &self.0.depth)
            .field("dependents", &self.dependent_count())
            .finish()
    }
}

/// 构造标记守卫
pub(crate) struct ConstructionGuard {
    chain: Arc<ResolutionChain>,
    bean: BeanId,
}

impl Drop for ConstructionGuard {
    fn drop(&mut self) {
        let mut constructing = self.chain.constructing.lock();
        if let Some(position) = constructing.iter().rposition(|(id, _)| *id == self.bean) {
            constructing.remove(position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::DefaultBeanManager;
    use di_abstractions::{instance, MetaClass, MetaConstructor, MetaMethod, TypeDescriptor};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tracked_bean(manager: &Arc<DefaultBeanManager>, destroyed: Arc<AtomicUsize>) -> Arc<Bean> {
        let class = MetaClass::new(TypeDescriptor::class("Connection"))
            .with_constructor(MetaConstructor::new(|_| Ok(instance(String::from("conn")))))
            .with_method(
                MetaMethod::new("close", TypeDescriptor::unit(), move |_, _| {
                    destroyed.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                })
                .pre_destroy(),
            );
        manager.load_beans([Arc::new(class)]).unwrap().remove(0)
    }

    #[test]
    fn test_close_destroys_tracked_dependents() {
        let manager = DefaultBeanManager::new();
        let destroyed = Arc::new(AtomicUsize::new(0));
        let bean = tracked_bean(&manager, Arc::clone(&destroyed));
        let root = manager.create_initialization_context(None);

        manager.get_value(&bean, &root).unwrap();
        manager.get_value(&bean, &root).unwrap();
        assert_eq!(root.dependent_count(), 2);
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);

        root.close();
        assert_eq!(destroyed.load(Ordering::SeqCst), 2);
        assert_eq!(root.dependent_count(), 0);
    }

    #[test]
    fn test_close_skips_own_bean() {
        let manager = DefaultBeanManager::new();
        let destroyed = Arc::new(AtomicUsize::new(0));
        let bean = tracked_bean(&manager, Arc::clone(&destroyed));
        let root = manager.create_initialization_context(Some(Arc::clone(&bean)));

        manager.get_value(&bean, &root).unwrap();
        root.close();

        assert_eq!(destroyed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_incomplete_instances_shared_along_chain() {
        let root = InitializationContext::new(None);
        let linked = root.linked_root(None);
        let value = instance(7_u32);

        linked.add_incomplete_instance(BeanId(9), Arc::clone(&value));
        assert!(root
            .incomplete_instance(BeanId(9))
            .is_some_and(|v| Arc::ptr_eq(&v, &value)));
        assert_eq!(linked.depth(), 1);

        root.remove_incomplete_instance(BeanId(9));
        assert!(linked.incomplete_instance(BeanId(9)).is_none());
    }

    #[test]
    fn test_non_dependent_bean_only_below_root() {
        let manager = DefaultBeanManager::new();
        let bean = tracked_bean(&manager, Arc::default());
        let root = InitializationContext::new(Some(Arc::clone(&bean)));
        assert!(root.non_dependent_bean().is_none());

        let child = root.create_dependent_context(Arc::clone(&bean), None);
        assert!(child.non_dependent_bean().is_none());
        assert_eq!(child.depth(), 1);
        assert_eq!(child.bean().map(|b| b.id()), Some(bean.id()));
    }
}
