//! 生产者与销毁方法
//!
//! 生产者字段或方法产生组件的值；匹配的销毁方法在实例销毁时被调用，
//! 被销毁的实例绑定到它的 `@Disposes` 参数。

use std::fmt;
use std::sync::Arc;

use di_abstractions::{ElementInfo, InjectionPoint, Instance, MetaField, MetaMethod};
use infrastructure_common::{InjectionError, InjectionResult};
use tracing::debug;

use crate::bean::Bean;
use crate::context::InitializationContext;
use crate::injector::Injector;

/// 生产者成员
#[derive(Debug, Clone)]
pub enum ProducerMember {
    Field(Arc<MetaField>),
    Method(Arc<MetaMethod>),
}

impl ProducerMember {
    pub fn element(&self) -> &ElementInfo {
        match self {
            Self::Field(field) => &field.element,
            Self::Method(method) => &method.element,
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            Self::Field(field) => field.is_static,
            Self::Method(method) => method.is_static,
        }
    }
}

impl fmt::Display for ProducerMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => write!(f, "{field}"),
            Self::Method(method) => write!(f, "{method}"),
        }
    }
}

/// 与生产者匹配的销毁方法及其注入点
#[derive(Debug)]
pub struct Disposer {
    method: Arc<MetaMethod>,
    points: Vec<InjectionPoint>,
}

impl Disposer {
    pub fn new(method: Arc<MetaMethod>, points: Vec<InjectionPoint>) -> Self {
        Self { method, points }
    }

    pub fn method(&self) -> &Arc<MetaMethod> {
        &self.method
    }

    pub fn injection_points(&self) -> &[InjectionPoint] {
        &self.points
    }
}

/// 生产者工厂
#[derive(Debug)]
pub struct ProducerFactory {
    declaring_bean: Option<Arc<Bean>>,
    member: ProducerMember,
    disposer: Option<Disposer>,
    injector: Injector,
}

impl ProducerFactory {
    /// 非静态成员必须有声明组件
    pub fn new(
        declaring_bean: Option<Arc<Bean>>,
        member: ProducerMember,
        disposer: Option<Disposer>,
        injector: Injector,
    ) -> InjectionResult<Self> {
        if declaring_bean.is_none() && !member.is_static() {
            return Err(InjectionError::definition(format!(
                "非静态生产者 {member} 的声明类不是可注入组件"
            )));
        }
        Ok(Self {
            declaring_bean,
            member,
            disposer,
            injector,
        })
    }

    pub fn declaring_bean(&self) -> Option<&Arc<Bean>> {
        self.declaring_bean.as_ref()
    }

    pub fn member(&self) -> &ProducerMember {
        &self.member
    }

    pub fn disposer(&self) -> Option<&Disposer> {
        self.disposer.as_ref()
    }

    pub fn has_disposer(&self) -> bool {
        self.disposer.is_some()
    }

    /// 获取声明实例：先用解析链上的不完整实例，否则通过作用域获取
    fn declaring_instance(
        &self,
        static_member: bool,
        declaring_context: &InitializationContext,
    ) -> InjectionResult<Option<Instance>> {
        if static_member {
            return Ok(None);
        }
        let declaring = self.declaring_bean.as_ref().ok_or_else(|| {
            InjectionError::definition(format!("生产者 {} 没有声明组件", self.member))
        })?;
        if let Some(incomplete) = declaring_context.incomplete_instance(declaring.id()) {
            return Ok(Some(incomplete));
        }
        let manager = self.injector.manager()?;
        manager.get_value(declaring, declaring_context).map(Some)
    }

    /// 产生值，方法参数在 `context` 中解析，声明实例的上下文用后即关闭
    pub fn produce(&self, bean: &Bean, context: &InitializationContext) -> InjectionResult<Instance> {
        let declaring_context = context.linked_root(None);
        let result = self
            .declaring_instance(self.member.is_static(), &declaring_context)
            .and_then(|receiver| match &self.member {
                ProducerMember::Field(field) => field.get(receiver.as_ref()),
                ProducerMember::Method(method) => self
                    .injector
                    .invoke(receiver.as_ref(), method, bean.injection_points(), context)?
                    .ok_or_else(|| {
                        InjectionError::definition(format!("生产者方法 {method} 没有返回值"))
                    }),
            });
        declaring_context.close();
        result
    }

    /// 调用匹配的销毁方法
    pub fn dispose(&self, instance: &Instance, context: &InitializationContext) -> InjectionResult<()> {
        let Some(disposer) = &self.disposer else {
            return Ok(());
        };
        debug!("调用销毁方法 {}", disposer.method);
        let declaring_context = context.linked_root(None);
        let result = self
            .declaring_instance(disposer.method.is_static, &declaring_context)
            .and_then(|receiver| {
                self.injector.dispose(
                    receiver.as_ref(),
                    &disposer.method,
                    &disposer.points,
                    instance,
                    context,
                )
            });
        declaring_context.close();
        result
    }
}
