//! 缓存作用域
//!
//! 单例作用域和配置中声明的自定义作用域都使用这个实现：
//! 每个组件一个 `OnceCell` 槽位，读路径无锁，首次创建时只阻塞同一组件的调用方。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use di_abstractions::{BeanId, Instance, ScopeType};
use infrastructure_common::{InjectionError, InjectionResult};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::ScopeContext;
use crate::bean::Bean;
use crate::context::{InitializationContext, ScopedInstance};

type Slot = Arc<OnceCell<ScopedInstance>>;

/// 缓存作用域上下文
#[derive(Debug)]
pub struct SingletonScopeContext {
    scope_type: ScopeType,
    instances: DashMap<BeanId, Slot>,
    creation_order: Mutex<Vec<BeanId>>,
}

impl SingletonScopeContext {
    /// 单例作用域
    pub fn new() -> Self {
        Self::with_scope_type(ScopeType::SINGLETON)
    }

    /// 指定作用域类型的缓存作用域
    pub fn with_scope_type(scope_type: ScopeType) -> Self {
        Self {
            scope_type,
            instances: DashMap::new(),
            creation_order: Mutex::new(Vec::new()),
        }
    }

    /// 已创建的实例数量
    pub fn len(&self) -> usize {
        self.creation_order.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 组件实例的创建时间，尚未创建时没有
    pub fn created_at(&self, bean: &Bean) -> Option<DateTime<Utc>> {
        self.instances
            .get(&bean.id())
            .and_then(|slot| slot.get().map(ScopedInstance::created_at))
    }

    fn destroy_slot(&self, slot: &Slot) {
        if let Some(scoped) = slot.get() {
            debug!(
                "销毁 {} 实例 {}, 创建于 {}",
                self.scope_type,
                scoped.bean(),
                scoped.created_at()
            );
            if let Err(e) = scoped.destroy() {
                warn!("销毁 {} 实例 {} 失败: {}", self.scope_type, scoped.bean(), e);
            }
        }
    }
}

impl Default for SingletonScopeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeContext for SingletonScopeContext {
    fn scope_type(&self) -> &ScopeType {
        &self.scope_type
    }

    fn get_or_create(
        &self,
        bean: &Arc<Bean>,
        context: InitializationContext,
    ) -> InjectionResult<Instance> {
        if let Some(existing) = self.get_if_exists(bean) {
            return Ok(existing);
        }

        // 取出槽位后立即释放分片锁，创建过程中可能递归访问本作用域
        let slot: Slot = Arc::clone(&self.instances.entry(bean.id()).or_default());

        let mut created = false;
        let scoped = slot.get_or_try_init(|| {
            let instance = bean.create(&context)?;
            created = true;
            Ok::<_, InjectionError>(ScopedInstance::new(Arc::clone(bean), instance, context))
        })?;

        if created {
            self.creation_order.lock().push(bean.id());
            debug!("{} 创建实例 {}", self.scope_type, bean);
        }
        Ok(Arc::clone(scoped.instance()))
    }

    fn get_if_exists(&self, bean: &Bean) -> Option<Instance> {
        self.instances
            .get(&bean.id())
            .and_then(|slot| slot.get().map(|scoped| Arc::clone(scoped.instance())))
    }

    fn destroy(&self, bean: &Bean) {
        if let Some((_, slot)) = self.instances.remove(&bean.id()) {
            self.creation_order.lock().retain(|id| *id != bean.id());
            self.destroy_slot(&slot);
        }
    }

    fn close(&self) {
        let order = std::mem::take(&mut *self.creation_order.lock());
        debug!("关闭 {} 作用域, 销毁 {} 个实例", self.scope_type, order.len());
        for id in order.iter().rev() {
            if let Some((_, slot)) = self.instances.remove(id) {
                self.destroy_slot(&slot);
            }
        }
        self.instances.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::DefaultBeanManager;
    use di_abstractions::{
        instance, Arguments, MetaClass, MetaConstructor, MetaMethod, TypeDescriptor,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Named(&'static str);

    fn load(
        manager: &Arc<DefaultBeanManager>,
        name: &'static str,
        constructions: Arc<AtomicUsize>,
        destroyed: Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<Bean> {
        let class = MetaClass::new(TypeDescriptor::class(name))
            .with_scope(ScopeType::SINGLETON)
            .with_constructor(MetaConstructor::new(move |_: Arguments| {
                if constructions.fetch_add(1, Ordering::SeqCst) == 0 && name == "Flaky" {
                    return Err("首次构造失败".into());
                }
                Ok(instance(Named(name)))
            }))
            .with_method(
                MetaMethod::new("close", TypeDescriptor::unit(), move |receiver, _| {
                    let named = receiver.and_then(|r| r.downcast_ref::<Named>());
                    destroyed.lock().extend(named.map(|n| n.0));
                    Ok(None)
                })
                .pre_destroy(),
            );
        manager.load_beans([Arc::new(class)]).unwrap().remove(0)
    }

    fn context_for(bean: &Arc<Bean>) -> InitializationContext {
        InitializationContext::new(None).create_dependent_context(Arc::clone(bean), None)
    }

    #[test]
    fn test_concurrent_first_access_constructs_once() {
        let manager = DefaultBeanManager::new();
        let constructions = Arc::new(AtomicUsize::new(0));
        let bean = load(&manager, "Shared", Arc::clone(&constructions), Arc::default());
        let scope = SingletonScopeContext::new();

        let instances: Vec<Instance> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| s.spawn(|| scope.get_or_create(&bean, context_for(&bean)).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(constructions.load(Ordering::SeqCst), 1);
        assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn test_failed_construction_is_not_cached() {
        let manager = DefaultBeanManager::new();
        let constructions = Arc::new(AtomicUsize::new(0));
        let bean = load(&manager, "Flaky", Arc::clone(&constructions), Arc::default());
        let scope = SingletonScopeContext::new();

        assert!(matches!(
            scope.get_or_create(&bean, context_for(&bean)),
            Err(InjectionError::InvocationFailed { .. })
        ));
        assert!(scope.get_if_exists(&bean).is_none());
        assert!(scope.get_or_create(&bean, context_for(&bean)).is_ok());
        assert_eq!(constructions.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_close_destroys_in_reverse_creation_order() {
        let manager = DefaultBeanManager::new();
        let destroyed = Arc::new(Mutex::new(Vec::new()));
        let first = load(&manager, "First", Arc::default(), Arc::clone(&destroyed));
        let second = load(&manager, "Second", Arc::default(), Arc::clone(&destroyed));
        let scope = SingletonScopeContext::with_scope_type(ScopeType::new("Request"));

        scope.get_or_create(&first, context_for(&first)).unwrap();
        scope.get_or_create(&second, context_for(&second)).unwrap();
        let (created_first, created_second) = (
            scope.created_at(&first).unwrap(),
            scope.created_at(&second).unwrap(),
        );
        assert!(created_first <= created_second);
        scope.close();

        assert_eq!(*destroyed.lock(), vec!["Second", "First"]);
        assert!(scope.is_empty());
        assert!(scope.get_if_exists(&first).is_none());
        assert!(scope.created_at(&first).is_none());
    }

    #[test]
    fn test_destroy_single_bean() {
        let manager = DefaultBeanManager::new();
        let destroyed = Arc::new(Mutex::new(Vec::new()));
        let bean = load(&manager, "Single", Arc::default(), Arc::clone(&destroyed));
        let scope = SingletonScopeContext::new();

        scope.get_or_create(&bean, context_for(&bean)).unwrap();
        scope.destroy(&bean);

        assert_eq!(*destroyed.lock(), vec!["Single"]);
        assert!(scope.get_if_exists(&bean).is_none());
    }
}
