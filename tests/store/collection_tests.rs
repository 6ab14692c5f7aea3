use super::support::*;
use h4ul_store::CollectionUpdate;
use h4ul_store::runtime::PlanOutcome;
use serde_json::{Map, Value};

/// Backend that deletes one key right before every plan applies, standing
/// in for a concurrent writer that wins the race between the ownership
/// read and the mutation.
#[derive(Clone)]
struct LosesKeyBeforePlans {
    inner: MemoryBackend,
    doomed: String,
}

impl Backend for LosesKeyBeforePlans {
    async fn apply(&mut self, plan: &MutationPlan) -> Result<PlanOutcome, StoreError> {
        let delete = MutationPlan::new().command(MutationCommand::DeleteKey {
            key: self.doomed.clone(),
        });
        self.inner.apply(&delete).await?;
        self.inner.apply(plan).await
    }

    async fn get_doc(&mut self, key: &str) -> Result<Option<Map<String, Value>>, StoreError> {
        self.inner.get_doc(key).await
    }

    async fn get_docs(&mut self, keys: &[String]) -> Result<Vec<Option<Map<String, Value>>>, StoreError> {
        self.inner.get_docs(keys).await
    }

    async fn get_value(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get_value(key).await
    }

    async fn set_members(&mut self, key: &str) -> Result<Vec<String>, StoreError> {
        self.inner.set_members(key).await
    }

    async fn set_contains(&mut self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.inner.set_contains(key, member).await
    }

    async fn zrevrange(
        &mut self,
        key: &str,
        max_score: Option<i64>,
        offset: usize,
        count: usize,
    ) -> Result<Vec<(String, i64)>, StoreError> {
        self.inner.zrevrange(key, max_score, offset, count).await
    }

    async fn zrange_lex_prefix(&mut self, key: &str, prefix: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        self.inner.zrange_lex_prefix(key, prefix, limit).await
    }
}

#[tokio::test]
async fn create_lists_newest_first() {
    let store = store();
    setup_user(&store, "ada").await;
    tick().await;
    make_collection(&store, "ada", "Denim").await;
    tick().await;
    make_collection(&store, "ada", "Silk").await;

    let owned = store.collections().list_by_owner("ada").await.expect("list");
    let names: Vec<&str> = owned.iter().map(|c| c.name.as_str()).collect();
    // The wishlist was created at profile setup, so it sorts last.
    assert_eq!(names, ["Silk", "Denim", "My Wishlist"]);
}

#[tokio::test]
async fn create_requires_a_profile_and_a_name() {
    let store = store();

    let err = store
        .collections()
        .create(
            &store.session("ghost"),
            CollectionInput {
                name: "Orphans".to_string(),
                ..Default::default()
            },
        )
        .await
        .expect_err("no profile");
    assert!(matches!(err, StoreError::NotFound { entity: "user", .. }));

    setup_user(&store, "ada").await;
    let err = store
        .collections()
        .create(
            &store.session("ada"),
            CollectionInput {
                name: "   ".to_string(),
                ..Default::default()
            },
        )
        .await
        .expect_err("blank name");
    assert!(matches!(err, StoreError::Validation(_)));
}

#[tokio::test]
async fn add_and_remove_posts_are_idempotent() {
    let store = store();
    setup_user(&store, "ada").await;
    let collection = make_collection(&store, "ada", "Keepers").await;
    let post = make_post(&store, "ada", post_input("kept fit")).await;
    let session = store.session("ada");

    assert!(
        store
            .collections()
            .add_post(&session, &collection.id, &post.id)
            .await
            .expect("add")
    );
    assert!(
        !store
            .collections()
            .add_post(&session, &collection.id, &post.id)
            .await
            .expect("repeat add")
    );
    let shelved = store.collections().posts(&collection.id).await.expect("posts");
    assert_eq!(shelved.len(), 1);

    assert!(
        store
            .collections()
            .remove_post(&session, &collection.id, &post.id)
            .await
            .expect("remove")
    );
    assert!(
        !store
            .collections()
            .remove_post(&session, &collection.id, &post.id)
            .await
            .expect("repeat remove")
    );
    assert!(store.collections().posts(&collection.id).await.expect("posts").is_empty());
}

#[tokio::test]
async fn only_the_owner_files_posts() {
    let store = store();
    setup_user(&store, "ada").await;
    setup_user(&store, "bob").await;
    let collection = make_collection(&store, "ada", "Private shelf").await;
    let post = make_post(&store, "bob", post_input("bobs fit")).await;

    let err = store
        .collections()
        .add_post(&store.session("bob"), &collection.id, &post.id)
        .await
        .expect_err("foreign add");
    assert!(matches!(err, StoreError::Forbidden { .. }));

    // The owner may file anyone's post, which is how saves work.
    assert!(
        store
            .collections()
            .add_post(&store.session("ada"), &collection.id, &post.id)
            .await
            .expect("owner add")
    );
}

#[tokio::test]
async fn filing_a_missing_post_fails() {
    let store = store();
    setup_user(&store, "ada").await;
    let collection = make_collection(&store, "ada", "Keepers").await;

    let err = store
        .collections()
        .add_post(&store.session("ada"), &collection.id, "ghost")
        .await
        .expect_err("missing post");
    assert!(matches!(err, StoreError::NotFound { entity: "post", .. }));
}

#[tokio::test]
async fn filing_into_a_concurrently_deleted_collection_is_not_found() {
    let (store, backend) = test_store();
    setup_user(&store, "ada").await;
    let collection = make_collection(&store, "ada", "Fleeting").await;
    let post = make_post(&store, "ada", post_input("fit")).await;

    // The ownership read succeeds, then the collection vanishes before
    // the membership plan lands.
    let racy = Store::new(
        LosesKeyBeforePlans {
            inner: backend,
            doomed: Keys::new(TEST_PREFIX).collection(&collection.id),
        },
        TEST_PREFIX,
    );
    let err = racy
        .collections()
        .add_post(&racy.session("ada"), &collection.id, &post.id)
        .await
        .expect_err("collection gone mid-flight");
    assert!(matches!(err, StoreError::NotFound { entity: "collection", .. }));
    // Nothing was written for the aborted plan.
    assert!(
        !store
            .collections()
            .contains(&collection.id, &post.id)
            .await
            .expect("membership")
    );
}

#[tokio::test]
async fn update_renames_a_regular_collection() {
    let store = store();
    setup_user(&store, "ada").await;
    let collection = make_collection(&store, "ada", "Drafts").await;

    let mutation = store
        .collections()
        .update(
            &store.session("ada"),
            &collection.id,
            CollectionUpdate {
                name: Some("Finals".to_string()),
                is_private: Some(true),
            },
        )
        .await
        .expect("update");
    assert_eq!(mutation.record.name, "Finals");
    assert!(mutation.record.is_private);
    assert_eq!(mutation.previous.name, "Drafts");
}

#[tokio::test]
async fn the_wishlist_cannot_be_edited_or_deleted() {
    let store = store();
    let (_, wishlist) = setup_user(&store, "ada").await;
    let session = store.session("ada");

    let err = store
        .collections()
        .update(
            &session,
            &wishlist.id,
            CollectionUpdate {
                name: Some("Not a wishlist".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect_err("rename wishlist");
    assert!(matches!(err, StoreError::Forbidden { .. }));

    let err = store
        .collections()
        .delete(&session, &wishlist.id)
        .await
        .expect_err("delete wishlist");
    assert!(matches!(err, StoreError::Forbidden { .. }));
}

#[tokio::test]
async fn delete_removes_the_collection_but_not_its_posts() {
    let store = store();
    setup_user(&store, "ada").await;
    let collection = make_collection(&store, "ada", "Doomed").await;
    let post = make_post(
        &store,
        "ada",
        PostInput {
            collection_ids: Some(vec![collection.id.clone()]),
            ..post_input("survivor")
        },
    )
    .await;

    store
        .collections()
        .delete(&store.session("ada"), &collection.id)
        .await
        .expect("delete");

    assert!(store.collections().get(&collection.id).await.expect("get").is_none());
    assert!(store.posts().get(&post.id).await.expect("post").is_some());
    let owned = store.collections().list_by_owner("ada").await.expect("list");
    assert!(owned.iter().all(|c| c.id != collection.id));
}

#[tokio::test]
async fn wishlist_saves_round_trip() {
    let store = store();
    setup_user(&store, "ada").await;
    setup_user(&store, "bob").await;
    let post = make_post(&store, "bob", post_input("coveted coat")).await;
    let session = store.session("ada");

    assert!(!store.collections().is_saved(&session, &post.id).await.expect("fresh"));
    assert!(store.collections().save_post(&session, &post.id).await.expect("save"));
    assert!(!store.collections().save_post(&session, &post.id).await.expect("repeat"));
    assert!(store.collections().is_saved(&session, &post.id).await.expect("saved"));

    let wishlist = store
        .collections()
        .wishlist("ada")
        .await
        .expect("wishlist")
        .expect("exists");
    assert_eq!(wishlist.post_ids, [post.id.clone()]);

    assert!(store.collections().unsave_post(&session, &post.id).await.expect("remove"));
    assert!(!store.collections().is_saved(&session, &post.id).await.expect("cleared"));
}
