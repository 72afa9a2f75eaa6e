use super::config::DbConfig;
use crate::audit::{self, Drift};
use crate::core::{RecordId, Result, Visibility};
use crate::engine::CascadeReport;
use crate::model::{Comment, NewComment, NewPost, NewUser, Post, User};
use crate::report::{self, PostRanking, UserPosts};
use crate::storage::{EntityReader, InMemoryStorage, SnapshotManager};
use crate::transaction::{TransactionManager, TransactionStats, Tx};
use tracing::info;

/// The blog database: typed entity tables plus the counter-consistency engine.
///
/// Every public mutation runs in its own transaction. Use
/// [`BlogDb::with_transaction`] to group several operations into one unit.
///
/// ```
/// use blogdb::{BlogDb, NewPost, NewUser};
///
/// # fn main() -> blogdb::Result<()> {
/// let db = BlogDb::new();
/// let (user, post) = db.with_transaction(|tx| {
///     let user = tx.create_user(NewUser::new("ann", "ann@example.com", "secret"))?;
///     let post = tx.create_post(NewPost::new("Hello", "First post", user.meta.id))?;
///     Ok((user, post))
/// })?;
/// assert_eq!(db.user(user.meta.id)?.post_count, 1);
/// db.remove_post(post.meta.id)?;
/// assert_eq!(db.user(user.meta.id)?.post_count, 0);
/// # Ok(())
/// # }
/// ```
pub struct BlogDb {
    transactions: TransactionManager,
    config: DbConfig,
}

impl BlogDb {
    /// In-memory database with default settings.
    pub fn new() -> Self {
        let config = DbConfig::new();
        Self {
            transactions: TransactionManager::new(InMemoryStorage::new(), None, config.password_cost),
            config,
        }
    }

    /// Open a database, restoring the configured snapshot when it exists.
    pub fn open(config: DbConfig) -> Result<Self> {
        config.validate()?;

        let snapshots = config.snapshot_path.as_ref().map(SnapshotManager::new);
        let storage = match &snapshots {
            Some(manager) => match manager.load()? {
                Some(storage) => storage,
                None => {
                    info!(path = %manager.path().display(), "no snapshot yet, starting empty");
                    InMemoryStorage::new()
                }
            },
            None => InMemoryStorage::new(),
        };

        Ok(Self {
            transactions: TransactionManager::new(storage, snapshots, config.password_cost),
            config,
        })
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Run `f` as one transaction: commit when it returns `Ok`, roll back
    /// everything it wrote (counter updates included) when it returns `Err`.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Tx<'_>) -> Result<T>,
    {
        self.transactions.run(f)
    }

    /// Run a read-only closure against the committed state.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&InMemoryStorage) -> Result<T>,
    {
        self.transactions.read(f)
    }

    pub fn transaction_stats(&self) -> TransactionStats {
        self.transactions.stats()
    }

    // ------------------------------------------------------------------
    // One-shot operations
    // ------------------------------------------------------------------

    pub fn create_user(&self, input: NewUser) -> Result<User> {
        self.with_transaction(|tx| tx.create_user(input))
    }

    pub fn create_post(&self, input: NewPost) -> Result<Post> {
        self.with_transaction(|tx| tx.create_post(input))
    }

    pub fn create_comment(&self, input: NewComment) -> Result<Comment> {
        self.with_transaction(|tx| tx.create_comment(input))
    }

    pub fn remove_comment(&self, comment_id: RecordId) -> Result<Comment> {
        self.with_transaction(|tx| tx.remove_comment(comment_id))
    }

    pub fn remove_post(&self, post_id: RecordId) -> Result<CascadeReport> {
        self.with_transaction(|tx| tx.remove_post(post_id))
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn user(&self, id: RecordId) -> Result<User> {
        self.read(|s| s.find_by_id(id, Visibility::Live))
    }

    pub fn post(&self, id: RecordId) -> Result<Post> {
        self.read(|s| s.find_by_id(id, Visibility::Live))
    }

    pub fn comment(&self, id: RecordId) -> Result<Comment> {
        self.read(|s| s.find_by_id(id, Visibility::Live))
    }

    pub fn user_posts_with_comments(&self, user_id: RecordId) -> Result<UserPosts> {
        self.read(|s| report::user_posts_with_comments(s, user_id))
    }

    pub fn most_commented_posts(&self) -> Result<Vec<PostRanking>> {
        self.read(|s| report::most_commented_posts(s))
    }

    pub fn audit_counters(&self) -> Result<Vec<Drift>> {
        self.read(|s| audit::audit_counters(s))
    }
}

impl Default for BlogDb {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BlogDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlogDb")
            .field("config", &self.config)
            .field("stats", &self.transactions.stats())
            .finish()
    }
}
