//! 解析管线
//!
//! 前置动作按阶段顺序执行，某个策略标记完成时提前结束；
//! 后置动作只对执行过前置动作的策略按相反顺序执行。

use crate::context::{BuildContext, ResolveSession};
use di_abstractions::Instance;
use infrastructure_common::{BuildKey, DependencyResult};
use tracing::debug;

pub(crate) fn execute(
    session: &ResolveSession<'_>,
    key: &BuildKey,
    existing: Option<Instance>,
) -> DependencyResult<Instance> {
    session
        .enter(key)
        .map_err(|error| session.locate(key, error, false))?;

    let plan = session.plan_for(key);
    let mut context = BuildContext::new(session, key.clone(), plan, existing);
    let result = run_phases(&mut context)
        .and_then(|()| context.take_value())
        .map_err(|error| session.locate(key, error, true));

    if let Err(error) = &result {
        context.abandon_guard(error);
    }
    session.leave();
    result
}

fn run_phases(context: &mut BuildContext<'_>) -> DependencyResult<()> {
    let plan = context.plan_handle();
    let strategies = plan.strategies();

    let mut invoked = 0;
    for strategy in strategies {
        strategy.pre_build_up(context)?;
        invoked += 1;
        if context.is_complete() {
            debug!("构建提前完成: {} ({})", context.key(), strategy.name());
            break;
        }
    }

    for strategy in strategies[..invoked].iter().rev() {
        strategy.post_build_up(context)?;
    }
    Ok(())
}
