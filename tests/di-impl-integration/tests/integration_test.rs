//! 组件管理器的并发集成测试
use di_abstractions::{
    instance, Arguments, Instance, MetaClass, MetaConstructor, MetaField, MetaParameter, Provider,
    Qualifiers, ScopeType, TypeDescriptor,
};
use di_impl::DefaultBeanManager;
use infrastructure_common::{init_logging, InjectionResult, LoggingConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

fn setup() {
    INIT.call_once(|| {
        let _ = init_logging(&LoggingConfig::default());
    });
}

/// 日志器，由配置持有者的字段产生
#[derive(Debug)]
struct Logger;

/// 配置持有者
#[derive(Debug)]
struct ConfigHolder {
    logger: Instance,
}

/// 在阻塞线程池上并发执行 `task`
async fn run_concurrently<F>(tasks: usize, task: F) -> anyhow::Result<Vec<Instance>>
where
    F: Fn() -> InjectionResult<Instance> + Send + Sync + 'static,
{
    let task = Arc::new(task);
    let handles: Vec<_> = (0..tasks)
        .map(|_| {
            let task = Arc::clone(&task);
            tokio::task::spawn_blocking(move || task())
        })
        .collect();

    let mut instances = Vec::with_capacity(tasks);
    for handle in handles {
        instances.push(handle.await??);
    }
    Ok(instances)
}

fn all_same(instances: &[Instance]) -> bool {
    instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1]))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_singleton_constructed_once_under_contention() -> anyhow::Result<()> {
    setup();
    let constructions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&constructions);
    let registry = MetaClass::new(TypeDescriptor::class("Registry"))
        .with_scope(ScopeType::SINGLETON)
        .with_constructor(MetaConstructor::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            Ok(instance(String::from("registry")))
        }));

    let manager = DefaultBeanManager::new();
    let bean = manager.load_beans([Arc::new(registry)])?.remove(0);

    let resolver = Arc::clone(&manager);
    let instances = run_concurrently(32, move || {
        let context = resolver.create_initialization_context(None);
        resolver.get_value(&bean, &context)
    })
    .await?;

    assert_eq!(instances.len(), 32);
    assert!(all_same(&instances));
    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_producer_field_of_singleton_read_once() -> anyhow::Result<()> {
    setup();
    let constructions = Arc::new(AtomicUsize::new(0));
    let reads = Arc::new(AtomicUsize::new(0));
    let (constructed, read) = (Arc::clone(&constructions), Arc::clone(&reads));

    let holder = MetaClass::new(TypeDescriptor::class("ConfigHolder"))
        .with_scope(ScopeType::SINGLETON)
        .with_constructor(MetaConstructor::new(move |_| {
            constructed.fetch_add(1, Ordering::SeqCst);
            Ok(instance(ConfigHolder {
                logger: instance(Logger),
            }))
        }))
        .with_field(
            MetaField::new("logger", TypeDescriptor::class("Logger"))
                .produces()
                .with_getter(move |receiver| {
                    read.fetch_add(1, Ordering::SeqCst);
                    let holder = receiver
                        .and_then(|r| r.downcast_ref::<ConfigHolder>())
                        .ok_or("接收者不是 ConfigHolder")?;
                    Ok(Arc::clone(&holder.logger))
                }),
        );

    let manager = DefaultBeanManager::new();
    manager.load_beans([Arc::new(holder)])?;
    let logger = manager
        .get_default_bean(&TypeDescriptor::class("Logger"))?
        .ok_or_else(|| anyhow::anyhow!("没有 Logger 组件"))?;
    assert_eq!(logger.scope(), &ScopeType::SINGLETON);

    let resolver = Arc::clone(&manager);
    let instances = run_concurrently(50, move || {
        let context = resolver.create_initialization_context(None);
        resolver.get_value(&logger, &context)
    })
    .await?;

    assert!(all_same(&instances));
    assert!(instances[0].is::<Logger>());
    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    assert_eq!(reads.load(Ordering::SeqCst), 1);

    manager.close();
    assert!(manager.is_closed());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_optional_resolution_synthesizes_one_bean() -> anyhow::Result<()> {
    setup();
    let widget = MetaClass::new(TypeDescriptor::class("Widget"))
        .with_constructor(MetaConstructor::new(|_| Ok(instance(String::from("widget")))));
    let manager = DefaultBeanManager::new();
    manager.load_beans([Arc::new(widget)])?;

    let optional = TypeDescriptor::optional_of(TypeDescriptor::class("Widget"));
    let resolver = Arc::clone(&manager);
    let instances = run_concurrently(16, move || {
        let bean = resolver
            .resolve(&optional, &Qualifiers::none())?
            .ok_or_else(|| infrastructure_common::InjectionError::unsatisfied("Optional<Widget>"))?;
        let context = resolver.create_initialization_context(None);
        resolver.get_value(&bean, &context)
    })
    .await?;

    // Widget 加上一个合成的 Optional 组件
    assert_eq!(manager.beans().len(), 2);
    for value in &instances {
        let value = value
            .downcast_ref::<Option<Instance>>()
            .ok_or_else(|| anyhow::anyhow!("不是 Optional 值"))?;
        assert!(value.as_ref().is_some_and(|w| w.is::<String>()));
    }
    Ok(())
}

/// 持有提供者的工厂
struct WidgetFactory(Arc<Provider>);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_provider_is_safe_to_share_across_threads() -> anyhow::Result<()> {
    setup();
    let constructions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&constructions);
    let widget = MetaClass::new(TypeDescriptor::class("Widget")).with_constructor(
        MetaConstructor::new(move |_| {
            Ok(instance(counter.fetch_add(1, Ordering::SeqCst)))
        }),
    );
    let factory = MetaClass::new(TypeDescriptor::class("WidgetFactory"))
        .with_scope(ScopeType::SINGLETON)
        .with_constructor(
            MetaConstructor::new(|args: Arguments| {
                Ok(instance(WidgetFactory(args.get::<Provider>(0)?)))
            })
            .with_parameter(MetaParameter::new(
                "widgets",
                TypeDescriptor::provider_of(TypeDescriptor::class("Widget")),
            ))
            .inject(),
        );

    let manager = DefaultBeanManager::new();
    manager.load_beans([Arc::new(widget), Arc::new(factory)])?;
    let factory_bean = manager
        .get_default_bean(&TypeDescriptor::class("WidgetFactory"))?
        .ok_or_else(|| anyhow::anyhow!("没有 WidgetFactory 组件"))?;
    let context = manager.create_initialization_context(None);
    let factory = manager.get_value_as::<WidgetFactory>(&factory_bean, &context)?;

    let provider = Arc::clone(&factory.0);
    let instances = run_concurrently(24, move || provider.get()).await?;

    let mut seen: Vec<usize> = instances
        .iter()
        .filter_map(|i| i.downcast_ref::<usize>().copied())
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..24).collect::<Vec<_>>());
    assert_eq!(constructions.load(Ordering::SeqCst), 24);
    Ok(())
}
