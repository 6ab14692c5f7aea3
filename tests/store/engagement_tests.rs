use super::support::*;

#[tokio::test]
async fn like_increments_the_counter_once() {
    let store = store();
    setup_user(&store, "ada").await;
    setup_user(&store, "bob").await;
    let post = make_post(&store, "bob", post_input("leather jacket")).await;
    let session = store.session("ada");

    assert!(store.engagement().like(&session, &post.id).await.expect("like"));
    assert!(!store.engagement().like(&session, &post.id).await.expect("repeat"));

    let stored = store.posts().get(&post.id).await.expect("get").expect("post");
    assert_eq!(stored.like_count, 1);
    assert!(store.engagement().is_liked("ada", &post.id).await.expect("liked"));
    assert_eq!(store.engagement().likers(&post.id).await.expect("likers"), ["ada"]);
}

#[tokio::test]
async fn unlike_reverses_the_like() {
    let store = store();
    setup_user(&store, "ada").await;
    setup_user(&store, "bob").await;
    let post = make_post(&store, "bob", post_input("silk scarf")).await;
    let session = store.session("ada");

    store.engagement().like(&session, &post.id).await.expect("like");
    assert!(store.engagement().unlike(&session, &post.id).await.expect("unlike"));
    assert!(!store.engagement().unlike(&session, &post.id).await.expect("repeat"));

    let stored = store.posts().get(&post.id).await.expect("get").expect("post");
    assert_eq!(stored.like_count, 0);
    assert!(!store.engagement().is_liked("ada", &post.id).await.expect("liked"));
}

#[tokio::test]
async fn owners_can_like_their_own_posts() {
    let store = store();
    setup_user(&store, "ada").await;
    let post = make_post(&store, "ada", post_input("own fit")).await;

    assert!(
        store
            .engagement()
            .like(&store.session("ada"), &post.id)
            .await
            .expect("self like")
    );
}

#[tokio::test]
async fn liking_a_missing_post_fails() {
    let store = store();
    setup_user(&store, "ada").await;

    let err = store
        .engagement()
        .like(&store.session("ada"), "ghost")
        .await
        .expect_err("missing post");
    assert!(matches!(err, StoreError::NotFound { entity: "post", .. }));
}
