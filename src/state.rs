use std::sync::Arc;

use crate::{
    config::Config,
    services::{AppController, SyncEngine},
};

/// 应用程序的共享状态
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Config,

    /// 根控制器：工作集、会话与全部操作
    pub controller: Arc<AppController>,

    /// 同步引擎，手动触发与定时器共用同一个单飞保护
    pub sync_engine: Arc<SyncEngine>,
}

impl AppState {
    pub fn new(config: Config, controller: Arc<AppController>, sync_engine: Arc<SyncEngine>) -> Self {
        Self {
            config,
            controller,
            sync_engine,
        }
    }
}
