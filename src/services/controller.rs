//! 应用控制器
//!
//! 持有当前工作集、会话表与远程存储句柄。所有读接口都基于不可变快照；
//! 每个操作在最新快照上校验并计算出新快照，写入本地缓存后返回，
//! 再尽力把变更的记录推送到远程。推送失败只记录日志，不影响操作结果，
//! 下一次同步会以远程数据为准。

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::feed::Discover;
use crate::models::profile::{LoginRequest, SignupRequest, UpdateProfileRequest};
use crate::models::session::{Session, SessionResponse};
use crate::models::video::PublishVideoRequest;
use crate::models::{
    Comment, FeedSnapshot, Notification, NotificationKind, Profile, ProfileView, Reply, Video,
};
use crate::services::auth::{hash_password, verify_password, SessionStore};
use crate::services::feed::FeedStore;
use crate::services::generator::MediaGenerator;
use crate::services::presence::PresenceService;
use crate::services::remote::RemoteStore;
use crate::utils::ids;
use crate::utils::validation::{validate_display_name, validate_password, validate_text, validate_username};

/// 一次操作需要推送到远程的记录
#[derive(Debug, Default)]
struct Changes {
    profiles: Vec<Profile>,
    videos: Vec<Video>,
    deleted_videos: Vec<String>,
}

impl Changes {
    fn none() -> Self {
        Self::default()
    }

    fn profile(mut self, profile: &Profile) -> Self {
        self.profiles.push(profile.clone());
        self
    }

    fn video(mut self, video: &Video) -> Self {
        self.videos.push(video.clone());
        self
    }
}

pub struct AppController {
    config: Config,
    feed: FeedStore,
    sessions: SessionStore,
    remote: Arc<dyn RemoteStore>,
    presence: PresenceService,
    generator: Arc<dyn MediaGenerator>,
}

impl AppController {
    pub fn new(
        config: Config,
        feed: FeedStore,
        remote: Arc<dyn RemoteStore>,
        generator: Arc<dyn MediaGenerator>,
    ) -> Self {
        let presence = PresenceService::new(remote.clone(), config.presence_interval());
        Self {
            config,
            feed,
            sessions: SessionStore::new(),
            remote,
            presence,
            generator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ---- 读接口 ----

    pub fn snapshot(&self) -> Arc<FeedSnapshot> {
        self.feed.snapshot()
    }

    /// 全部视频，按创建时间倒序
    pub fn feed(&self) -> Vec<Video> {
        self.snapshot().videos.clone()
    }

    /// 当前用户关注的人发布的视频
    pub fn following_feed(&self, username: &str) -> Result<Vec<Video>> {
        let snapshot = self.snapshot();
        let me = snapshot
            .profile(username)
            .ok_or_else(|| AppError::not_found("Profile"))?;

        Ok(snapshot
            .videos
            .iter()
            .filter(|v| me.is_following(&v.username))
            .cloned()
            .collect())
    }

    /// 发现页：有关键词时搜索视频和用户，否则按热度排列
    pub fn discover(&self, query: Option<&str>) -> Discover {
        let snapshot = self.snapshot();
        let now = Utc::now();
        let window = self.config.online_window();
        let query = query.map(str::trim).filter(|q| !q.is_empty());

        match query {
            Some(q) => {
                let needle = q.to_lowercase();
                let videos = snapshot.videos.iter().filter(|v| v.matches(q)).cloned().collect();
                let profiles = snapshot
                    .profiles
                    .values()
                    .filter(|p| !p.banned)
                    .filter(|p| {
                        p.username.to_lowercase().contains(&needle)
                            || p.display_name.to_lowercase().contains(&needle)
                    })
                    .map(|p| p.to_view(now, window))
                    .collect();
                Discover { videos, profiles }
            }
            None => {
                let mut videos = snapshot.videos.clone();
                // 稳定排序，热度相同时保持时间倒序
                videos.sort_by_key(|v| std::cmp::Reverse(v.likes.saturating_add(v.reposts)));
                Discover {
                    videos,
                    profiles: Vec::new(),
                }
            }
        }
    }

    pub fn profile(&self, username: &str) -> Result<ProfileView> {
        self.profile_in(&self.snapshot(), username)
    }

    /// 在指定快照中查找资料并转为展示视图
    pub fn profile_in(&self, snapshot: &FeedSnapshot, username: &str) -> Result<ProfileView> {
        snapshot
            .profile(username)
            .map(|p| p.to_view(Utc::now(), self.config.online_window()))
            .ok_or_else(|| AppError::not_found("Profile"))
    }

    pub fn profile_videos(&self, username: &str) -> Result<Vec<Video>> {
        let snapshot = self.snapshot();
        if snapshot.profile(username).is_none() {
            return Err(AppError::not_found("Profile"));
        }
        Ok(snapshot.videos_by(username))
    }

    /// 通知列表，最新的在前
    pub fn notifications(&self, username: &str) -> Result<Vec<Notification>> {
        let snapshot = self.snapshot();
        let profile = snapshot
            .profile(username)
            .ok_or_else(|| AppError::not_found("Profile"))?;

        let mut notifications = profile.notifications.clone();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    // ---- 会话 ----

    pub async fn signup(&self, req: SignupRequest) -> Result<SessionResponse> {
        req.validate()?;
        validate_username(&req.username)?;
        validate_password(&req.password)?;

        let display_name = req
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(req.username.as_str())
            .to_string();
        validate_display_name(&display_name)?;

        let password_hash = hash_password(&req.password)?;
        let username = req.username.clone();

        let snapshot = self
            .commit("signup", |next| {
                if next.profile(&username).is_some() {
                    return Err(AppError::conflict("用户名已被使用"));
                }
                let profile = Profile::new(username.clone(), display_name, password_hash, Utc::now());
                let changes = Changes::none().profile(&profile);
                next.upsert_profile(profile);
                Ok(changes)
            })
            .await?;

        info!("New profile created: {}", req.username);
        self.open_session(&snapshot, &req.username)
    }

    pub async fn login(&self, req: LoginRequest) -> Result<SessionResponse> {
        req.validate()?;
        let snapshot = self.snapshot();

        let profile = snapshot
            .profile(&req.username)
            .ok_or_else(|| AppError::unauthorized("用户名或密码错误"))?;

        if profile.banned {
            return Err(AppError::forbidden("账号已被封禁"));
        }

        let matches = profile
            .password_hash
            .as_deref()
            .map(|hash| verify_password(&req.password, hash))
            .unwrap_or(false);
        if !matches {
            debug!("Password mismatch for {}", req.username);
            return Err(AppError::unauthorized("用户名或密码错误"));
        }

        info!("User logged in: {}", req.username);
        self.open_session(&snapshot, &req.username)
    }

    fn open_session(&self, snapshot: &FeedSnapshot, username: &str) -> Result<SessionResponse> {
        let profile = self.profile_in(snapshot, username)?;

        let session = self.sessions.create(username);
        self.presence.arm(&session.token, username);

        Ok(SessionResponse {
            token: session.token,
            profile,
        })
    }

    pub fn logout(&self, token: &str) -> bool {
        self.presence.disarm(token);
        match self.sessions.remove(token) {
            Some(session) => {
                info!("User logged out: {}", session.username);
                true
            }
            None => false,
        }
    }

    /// 解析 bearer token；被封禁的用户会话立即结束
    pub fn session(&self, token: &str) -> Result<Session> {
        let session = self
            .sessions
            .get(token)
            .ok_or_else(|| AppError::unauthorized("会话无效或已过期"))?;

        let banned = self
            .snapshot()
            .profile(&session.username)
            .map(|p| p.banned)
            .unwrap_or(false);
        if banned {
            self.end_sessions(&session.username);
            return Err(AppError::forbidden("账号已被封禁"));
        }

        Ok(session)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.active_count()
    }

    fn end_sessions(&self, username: &str) {
        for session in self.sessions.remove_user(username) {
            self.presence.disarm(&session.token);
        }
    }

    /// 停止所有心跳循环
    pub fn shutdown(&self) {
        self.presence.disarm_all();
    }

    // ---- 资料 ----

    pub async fn update_profile(&self, actor: &str, req: UpdateProfileRequest) -> Result<Arc<FeedSnapshot>> {
        req.validate()?;
        if let Some(name) = &req.display_name {
            validate_display_name(name)?;
        }
        if let Some(bio) = &req.bio {
            validate_text("简介", bio, self.config.max_bio_length, true)?;
        }

        let cooldown = self.config.display_name_cooldown();
        self.commit("update_profile", |next| {
            let profile = active_profile_mut(next, actor)?;
            let now = Utc::now();

            if let Some(name) = req.display_name.as_deref().map(str::trim) {
                if name != profile.display_name {
                    if let Some(changed_at) = profile.display_name_changed_at {
                        let elapsed = now.signed_duration_since(changed_at);
                        if elapsed < cooldown {
                            let remaining = cooldown - elapsed;
                            return Err(AppError::Cooldown(format!(
                                "显示名称每{}天只能修改一次，请在{}小时后再试",
                                cooldown.num_days(),
                                remaining.num_hours().max(1)
                            )));
                        }
                    }
                    profile.display_name = name.to_string();
                    profile.display_name_changed_at = Some(now);
                }
            }

            if let Some(bio) = &req.bio {
                profile.bio = bio.trim().to_string();
            }

            if let Some(avatar) = &req.avatar_url {
                profile.avatar_url = Some(avatar.trim().to_string()).filter(|a| !a.is_empty());
            }

            Ok(Changes::none().profile(profile))
        })
        .await
    }

    pub async fn follow(&self, actor: &str, target: &str) -> Result<Arc<FeedSnapshot>> {
        if actor == target {
            return Err(AppError::bad_request("不能关注自己"));
        }

        self.commit("follow", |next| {
            ensure_active(next, actor)?;
            if next.profile(target).is_none() {
                return Err(AppError::not_found("Profile"));
            }

            let follower = active_profile_mut(next, actor)?;
            if follower.is_following(target) {
                return Ok(Changes::none());
            }
            follower.follows.insert(target.to_string(), true);
            follower.following = follower.following.saturating_add(1);
            let changes = Changes::none().profile(follower);

            let followed = profile_mut(next, target)?;
            followed.followers = followed.followers.saturating_add(1);
            followed.notifications.push(Notification::new(
                NotificationKind::Follow,
                actor,
                None,
                format!("{} started following you", actor),
                Utc::now(),
            ));
            Ok(changes.profile(followed))
        })
        .await
    }

    pub async fn unfollow(&self, actor: &str, target: &str) -> Result<Arc<FeedSnapshot>> {
        self.commit("unfollow", |next| {
            let follower = active_profile_mut(next, actor)?;
            if !follower.is_following(target) {
                return Ok(Changes::none());
            }
            follower.follows.remove(target);
            follower.following = follower.following.saturating_sub(1);
            let mut changes = Changes::none().profile(follower);

            if let Some(followed) = next.profile_mut(target) {
                followed.followers = followed.followers.saturating_sub(1);
                changes = changes.profile(followed);
            }
            Ok(changes)
        })
        .await
    }

    pub async fn mark_notifications_read(&self, actor: &str) -> Result<Arc<FeedSnapshot>> {
        self.commit("mark_notifications_read", |next| {
            let profile = profile_mut(next, actor)?;
            if profile.unread_notifications() == 0 {
                return Ok(Changes::none());
            }
            for notification in profile.notifications.iter_mut() {
                notification.read = true;
            }
            Ok(Changes::none().profile(profile))
        })
        .await
    }

    // ---- 视频 ----

    /// 发布视频，返回新快照和新视频的 id
    pub async fn publish_video(&self, actor: &str, req: PublishVideoRequest) -> Result<(Arc<FeedSnapshot>, String)> {
        req.validate()?;
        validate_text("视频描述", &req.description, self.config.max_description_length, true)?;

        let music = req
            .music
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("original sound - {}", actor));

        self.commit_with("publish_video", |next| {
            ensure_active(next, actor)?;
            let now = Utc::now();
            let mut video = Video::new(
                actor,
                req.media_url.trim().to_string(),
                req.description.trim().to_string(),
                music,
                now,
            );
            while next.video(&video.id).is_some() {
                video.id = ids::video_id(now);
            }

            let changes = Changes::none().video(&video);
            let id = video.id.clone();
            next.upsert_video(video);
            Ok((changes, id))
        })
        .await
    }

    /// 删除视频，仅限发布者或管理员
    pub async fn delete_video(&self, actor: &str, video_id: &str) -> Result<Arc<FeedSnapshot>> {
        self.commit("delete_video", |next| {
            let is_admin = ensure_active(next, actor)?.admin;
            let video = next.video(video_id).ok_or_else(|| AppError::not_found("Video"))?;
            if video.username != actor && !is_admin {
                return Err(AppError::forbidden("只能删除自己发布的视频"));
            }

            next.remove_video(video_id);
            Ok(Changes {
                deleted_videos: vec![video_id.to_string()],
                ..Changes::none()
            })
        })
        .await
    }

    pub async fn toggle_like(&self, actor: &str, video_id: &str) -> Result<Arc<FeedSnapshot>> {
        self.commit("toggle_like", |next| {
            ensure_active(next, actor)?;
            let video = video_mut(next, video_id)?;
            let liked = !video.liked_by.remove(actor);
            if liked {
                video.liked_by.insert(actor.to_string());
                video.likes = video.likes.saturating_add(1);
            } else {
                video.likes = video.likes.saturating_sub(1);
            }
            let owner = video.username.clone();
            let mut changes = Changes::none().video(video);

            if let Some(profile) = next.profile_mut(&owner) {
                if liked {
                    profile.likes = profile.likes.saturating_add(1);
                    if owner != actor {
                        profile.notifications.push(Notification::new(
                            NotificationKind::Like,
                            actor,
                            Some(video_id),
                            format!("{} liked your video", actor),
                            Utc::now(),
                        ));
                    }
                } else {
                    profile.likes = profile.likes.saturating_sub(1);
                }
                changes = changes.profile(profile);
            }
            Ok(changes)
        })
        .await
    }

    pub async fn toggle_repost(&self, actor: &str, video_id: &str) -> Result<Arc<FeedSnapshot>> {
        self.commit("toggle_repost", |next| {
            ensure_active(next, actor)?;
            let video = video_mut(next, video_id)?;
            let reposted = !video.reposted_by.remove(actor);
            if reposted {
                video.reposted_by.insert(actor.to_string());
                video.reposts = video.reposts.saturating_add(1);
            } else {
                video.reposts = video.reposts.saturating_sub(1);
            }
            let owner = video.username.clone();
            let mut changes = Changes::none().video(video);

            if reposted && owner != actor {
                if let Some(profile) = next.profile_mut(&owner) {
                    profile.notifications.push(Notification::new(
                        NotificationKind::Repost,
                        actor,
                        Some(video_id),
                        format!("{} reposted your video", actor),
                        Utc::now(),
                    ));
                    changes = changes.profile(profile);
                }
            }
            Ok(changes)
        })
        .await
    }

    pub async fn record_view(&self, video_id: &str) -> Result<Arc<FeedSnapshot>> {
        self.commit("record_view", |next| {
            let video = video_mut(next, video_id)?;
            video.views = video.views.saturating_add(1);
            Ok(Changes::none().video(video))
        })
        .await
    }

    pub async fn add_comment(&self, actor: &str, video_id: &str, text: &str) -> Result<Arc<FeedSnapshot>> {
        validate_text("评论", text, self.config.max_comment_length, false)?;
        let text = text.trim().to_string();

        self.commit("add_comment", |next| {
            ensure_active(next, actor)?;
            let now = Utc::now();
            let video = video_mut(next, video_id)?;
            let comment = Comment {
                id: video.fresh_comment_id(now),
                username: actor.to_string(),
                text: text.clone(),
                created_at: now,
                replies: Vec::new(),
            };
            video.comments.push(comment);
            let owner = video.username.clone();
            let mut changes = Changes::none().video(video);

            if owner != actor {
                if let Some(profile) = next.profile_mut(&owner) {
                    profile.notifications.push(Notification::new(
                        NotificationKind::Comment,
                        actor,
                        Some(video_id),
                        format!("{} commented: {}", actor, text),
                        now,
                    ));
                    changes = changes.profile(profile);
                }
            }
            Ok(changes)
        })
        .await
    }

    pub async fn add_reply(
        &self,
        actor: &str,
        video_id: &str,
        comment_id: &str,
        text: &str,
    ) -> Result<Arc<FeedSnapshot>> {
        validate_text("回复", text, self.config.max_comment_length, false)?;
        let text = text.trim().to_string();

        self.commit("add_reply", |next| {
            ensure_active(next, actor)?;
            let now = Utc::now();
            let video = video_mut(next, video_id)?;
            let comment = video
                .comment_mut(comment_id)
                .ok_or_else(|| AppError::not_found("Comment"))?;
            let reply = Reply {
                id: comment.fresh_reply_id(now),
                username: actor.to_string(),
                text: text.clone(),
                created_at: now,
            };
            comment.replies.push(reply);
            let author = comment.username.clone();
            let mut changes = Changes::none().video(video);

            if author != actor {
                if let Some(profile) = next.profile_mut(&author) {
                    profile.notifications.push(Notification::new(
                        NotificationKind::Reply,
                        actor,
                        Some(video_id),
                        format!("{} replied: {}", actor, text),
                        now,
                    ));
                    changes = changes.profile(profile);
                }
            }
            Ok(changes)
        })
        .await
    }

    /// 删除评论：评论作者、视频发布者或管理员
    pub async fn delete_comment(&self, actor: &str, video_id: &str, comment_id: &str) -> Result<Arc<FeedSnapshot>> {
        self.commit("delete_comment", |next| {
            let is_admin = ensure_active(next, actor)?.admin;
            let video = video_mut(next, video_id)?;
            let comment = video
                .comment(comment_id)
                .ok_or_else(|| AppError::not_found("Comment"))?;

            if comment.username != actor && video.username != actor && !is_admin {
                return Err(AppError::forbidden("没有权限删除这条评论"));
            }

            video.comments.retain(|c| c.id != comment_id);
            Ok(Changes::none().video(video))
        })
        .await
    }

    // ---- 管理 ----

    pub async fn set_banned(&self, actor: &str, target: &str, banned: bool) -> Result<Arc<FeedSnapshot>> {
        if actor == target {
            return Err(AppError::bad_request("不能封禁自己"));
        }

        let snapshot = self
            .commit("set_banned", |next| {
                ensure_admin(next, actor)?;
                let profile = profile_mut(next, target)?;
                if profile.banned == banned {
                    return Ok(Changes::none());
                }
                profile.banned = banned;
                profile.notifications.push(Notification::new(
                    NotificationKind::Moderation,
                    actor,
                    None,
                    if banned {
                        "Your account has been suspended".to_string()
                    } else {
                        "Your account has been restored".to_string()
                    },
                    Utc::now(),
                ));
                Ok(Changes::none().profile(profile))
            })
            .await?;

        if banned {
            self.end_sessions(target);
            info!("{} banned by {}", target, actor);
        }
        Ok(snapshot)
    }

    pub async fn set_verified(&self, actor: &str, target: &str, verified: bool) -> Result<Arc<FeedSnapshot>> {
        self.commit("set_verified", |next| {
            ensure_admin(next, actor)?;
            let profile = profile_mut(next, target)?;
            if profile.verified == verified {
                return Ok(Changes::none());
            }
            profile.verified = verified;
            Ok(Changes::none().profile(profile))
        })
        .await
    }

    // ---- 生成 ----

    /// 生成配文，失败时退回原文
    pub async fn suggest_caption(&self, text: &str) -> String {
        match self.generator.generate_caption(text).await {
            Ok(caption) if !caption.is_empty() => caption,
            Ok(_) => text.trim().to_string(),
            Err(e) => {
                warn!("Caption generation failed, using input text: {}", e);
                text.trim().to_string()
            }
        }
    }

    pub async fn generate_video(&self, actor: &str, prompt: &str) -> Result<String> {
        ensure_active(&self.snapshot(), actor)?;
        validate_text("提示词", prompt, self.config.max_description_length, false)?;
        self.generator.generate_video(prompt.trim()).await
    }

    // ---- 内部 ----

    /// 在最新快照上执行变更、持久化，然后推送变更的记录
    async fn commit<F>(&self, action: &'static str, mutate: F) -> Result<Arc<FeedSnapshot>>
    where
        F: FnOnce(&mut FeedSnapshot) -> Result<Changes>,
    {
        let (snapshot, ()) = self
            .commit_with(action, |next| mutate(next).map(|changes| (changes, ())))
            .await?;
        Ok(snapshot)
    }

    async fn commit_with<F, R>(&self, action: &'static str, mutate: F) -> Result<(Arc<FeedSnapshot>, R)>
    where
        F: FnOnce(&mut FeedSnapshot) -> Result<(Changes, R)>,
    {
        let (snapshot, (changes, extra)) = self.feed.apply(|current| {
            let mut next = current.clone();
            let result = mutate(&mut next)?;
            Ok((next, result))
        })?;

        self.push(action, changes).await;
        Ok((snapshot, extra))
    }

    async fn push(&self, action: &str, changes: Changes) {
        for profile in &changes.profiles {
            if let Err(e) = self.remote.upsert_profile(profile).await {
                log_push_failure(action, &profile.username, &e);
            }
        }
        for video in &changes.videos {
            if let Err(e) = self.remote.upsert_video(video).await {
                log_push_failure(action, &video.id, &e);
            }
        }
        for id in &changes.deleted_videos {
            if let Err(e) = self.remote.delete_video(id).await {
                log_push_failure(action, id, &e);
            }
        }
    }
}

fn log_push_failure(action: &str, key: &str, e: &AppError) {
    if e.is_remote_failure() {
        debug!("Remote push for {} ({}) deferred, offline: {}", action, key, e);
    } else {
        warn!("Remote push for {} ({}) failed: {}", action, key, e);
    }
}

fn ensure_active<'a>(snapshot: &'a FeedSnapshot, username: &str) -> Result<&'a Profile> {
    let profile = snapshot
        .profile(username)
        .ok_or_else(|| AppError::unauthorized("会话用户不存在"))?;
    if profile.banned {
        return Err(AppError::forbidden("账号已被封禁"));
    }
    Ok(profile)
}

fn ensure_admin(snapshot: &FeedSnapshot, username: &str) -> Result<()> {
    if !ensure_active(snapshot, username)?.admin {
        return Err(AppError::forbidden("需要管理员权限"));
    }
    Ok(())
}

fn active_profile_mut<'a>(snapshot: &'a mut FeedSnapshot, username: &str) -> Result<&'a mut Profile> {
    ensure_active(snapshot, username)?;
    profile_mut(snapshot, username)
}

fn profile_mut<'a>(snapshot: &'a mut FeedSnapshot, username: &str) -> Result<&'a mut Profile> {
    snapshot
        .profile_mut(username)
        .ok_or_else(|| AppError::not_found("Profile"))
}

fn video_mut<'a>(snapshot: &'a mut FeedSnapshot, id: &str) -> Result<&'a mut Video> {
    snapshot
        .video_mut(id)
        .ok_or_else(|| AppError::not_found("Video"))
}
