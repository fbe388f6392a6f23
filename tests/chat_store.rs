//! Chat store integration tests
//!
//! Exercises the conversation/message contract against a real (in-memory)
//! database: pair idempotence, the create race, pagination, read
//! receipts, and validation failures.

mod common;

use common::{seed_user, test_pool};
use pretty_assertions::assert_eq;
use ripple::chat::store::{ChatStore, ChatStoreError, MAX_CONTENT_CHARS};
use uuid::Uuid;

#[tokio::test]
async fn get_or_create_is_idempotent_and_order_insensitive() {
    let pool = test_pool().await;
    let store = ChatStore::new(pool.clone());
    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;

    let first = store
        .get_or_create_conversation(alice.id, bob.id)
        .await
        .unwrap();
    let second = store
        .get_or_create_conversation(alice.id, bob.id)
        .await
        .unwrap();
    let flipped = store
        .get_or_create_conversation(bob.id, alice.id)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.id, flipped.id);
}

#[tokio::test]
async fn concurrent_creates_yield_one_conversation() {
    let pool = test_pool().await;
    let store = ChatStore::new(pool.clone());
    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;

    let (a, b) = tokio::join!(
        store.get_or_create_conversation(alice.id, bob.id),
        store.get_or_create_conversation(bob.id, alice.id),
    );

    assert_eq!(a.unwrap().id, b.unwrap().id);

    let ids = store.conversation_ids_for(alice.id).await.unwrap();
    assert_eq!(ids.len(), 1);
}

#[tokio::test]
async fn self_conversation_is_rejected() {
    let pool = test_pool().await;
    let store = ChatStore::new(pool.clone());
    let alice = seed_user(&pool, "alice").await;

    let result = store.get_or_create_conversation(alice.id, alice.id).await;
    assert!(matches!(result, Err(ChatStoreError::SelfConversation)));
}

#[tokio::test]
async fn conversation_with_unknown_user_is_rejected() {
    let pool = test_pool().await;
    let store = ChatStore::new(pool.clone());
    let alice = seed_user(&pool, "alice").await;

    let result = store
        .get_or_create_conversation(alice.id, Uuid::new_v4())
        .await;
    assert!(matches!(result, Err(ChatStoreError::UserNotFound)));
}

#[tokio::test]
async fn appended_message_is_last_chronological_entry() {
    let pool = test_pool().await;
    let store = ChatStore::new(pool.clone());
    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;
    let conversation = store
        .get_or_create_conversation(alice.id, bob.id)
        .await
        .unwrap();

    store
        .append_message(conversation.id, alice.id, "first")
        .await
        .unwrap();
    let sent = store
        .append_message(conversation.id, bob.id, "second")
        .await
        .unwrap();

    let page = store
        .list_messages(conversation.id, alice.id, 1, 50)
        .await
        .unwrap();

    assert_eq!(page.messages.last().unwrap().id, sent.id);
    assert_eq!(page.messages.last().unwrap().content, "second");
    assert!(!page.has_more);
}

#[tokio::test]
async fn empty_content_is_rejected_without_mutation() {
    let pool = test_pool().await;
    let store = ChatStore::new(pool.clone());
    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;
    let conversation = store
        .get_or_create_conversation(alice.id, bob.id)
        .await
        .unwrap();

    let result = store.append_message(conversation.id, alice.id, "   ").await;
    assert!(matches!(result, Err(ChatStoreError::EmptyContent)));

    let page = store
        .list_messages(conversation.id, alice.id, 1, 50)
        .await
        .unwrap();
    assert!(page.messages.is_empty());

    let record = store.conversation(conversation.id).await.unwrap();
    assert!(record.last_message_at.is_none());
}

#[tokio::test]
async fn oversized_content_is_rejected() {
    let pool = test_pool().await;
    let store = ChatStore::new(pool.clone());
    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;
    let conversation = store
        .get_or_create_conversation(alice.id, bob.id)
        .await
        .unwrap();

    let long = "x".repeat(MAX_CONTENT_CHARS + 1);
    let result = store.append_message(conversation.id, alice.id, &long).await;
    assert!(matches!(result, Err(ChatStoreError::ContentTooLong(_))));
}

#[tokio::test]
async fn non_participant_cannot_append_or_read() {
    let pool = test_pool().await;
    let store = ChatStore::new(pool.clone());
    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;
    let mallory = seed_user(&pool, "mallory").await;
    let conversation = store
        .get_or_create_conversation(alice.id, bob.id)
        .await
        .unwrap();

    let result = store
        .append_message(conversation.id, mallory.id, "hi")
        .await;
    assert!(matches!(result, Err(ChatStoreError::NotParticipant)));

    let result = store
        .list_messages(conversation.id, mallory.id, 1, 50)
        .await;
    assert!(matches!(result, Err(ChatStoreError::NotParticipant)));

    let page = store
        .list_messages(conversation.id, alice.id, 1, 50)
        .await
        .unwrap();
    assert!(page.messages.is_empty());
}

#[tokio::test]
async fn append_to_missing_conversation_is_not_found() {
    let pool = test_pool().await;
    let store = ChatStore::new(pool.clone());
    let alice = seed_user(&pool, "alice").await;

    let result = store.append_message(Uuid::new_v4(), alice.id, "hi").await;
    assert!(matches!(result, Err(ChatStoreError::ConversationNotFound)));
}

#[tokio::test]
async fn unread_count_tracks_mark_read() {
    let pool = test_pool().await;
    let store = ChatStore::new(pool.clone());
    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;
    let conversation = store
        .get_or_create_conversation(alice.id, bob.id)
        .await
        .unwrap();

    store
        .append_message(conversation.id, alice.id, "one")
        .await
        .unwrap();
    store
        .append_message(conversation.id, alice.id, "two")
        .await
        .unwrap();

    assert_eq!(store.unread_count(conversation.id, bob.id).await.unwrap(), 2);
    // The sender has nothing unread.
    assert_eq!(
        store.unread_count(conversation.id, alice.id).await.unwrap(),
        0
    );

    let marked = store
        .mark_conversation_read(conversation.id, bob.id)
        .await
        .unwrap();
    assert_eq!(marked, 2);
    assert_eq!(store.unread_count(conversation.id, bob.id).await.unwrap(), 0);

    // Idempotent: nothing newly marked, count stays zero.
    let marked_again = store
        .mark_conversation_read(conversation.id, bob.id)
        .await
        .unwrap();
    assert_eq!(marked_again, 0);
    assert_eq!(store.unread_count(conversation.id, bob.id).await.unwrap(), 0);

    store
        .append_message(conversation.id, alice.id, "three")
        .await
        .unwrap();
    assert_eq!(store.unread_count(conversation.id, bob.id).await.unwrap(), 1);
}

#[tokio::test]
async fn fetching_history_marks_messages_read() {
    let pool = test_pool().await;
    let store = ChatStore::new(pool.clone());
    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;
    let conversation = store
        .get_or_create_conversation(alice.id, bob.id)
        .await
        .unwrap();

    store
        .append_message(conversation.id, alice.id, "hello")
        .await
        .unwrap();

    let page = store
        .list_messages(conversation.id, bob.id, 1, 50)
        .await
        .unwrap();

    assert!(page.messages[0].read_by.contains(&bob.id));
    assert_eq!(store.unread_count(conversation.id, bob.id).await.unwrap(), 0);
}

#[tokio::test]
async fn reader_sets_are_monotonic() {
    let pool = test_pool().await;
    let store = ChatStore::new(pool.clone());
    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;
    let conversation = store
        .get_or_create_conversation(alice.id, bob.id)
        .await
        .unwrap();

    store
        .append_message(conversation.id, alice.id, "hello")
        .await
        .unwrap();
    store
        .mark_conversation_read(conversation.id, bob.id)
        .await
        .unwrap();

    // Re-fetching, re-marking, and new traffic never shrink a reader set.
    store
        .list_messages(conversation.id, bob.id, 1, 50)
        .await
        .unwrap();
    store
        .mark_conversation_read(conversation.id, bob.id)
        .await
        .unwrap();

    let page = store
        .list_messages(conversation.id, alice.id, 1, 50)
        .await
        .unwrap();
    assert!(page.messages[0].read_by.contains(&bob.id));
}

#[tokio::test]
async fn pagination_returns_newest_page_first_in_chronological_order() {
    let pool = test_pool().await;
    let store = ChatStore::new(pool.clone());
    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;
    let conversation = store
        .get_or_create_conversation(alice.id, bob.id)
        .await
        .unwrap();

    for i in 1..=5 {
        store
            .append_message(conversation.id, alice.id, &format!("m{i}"))
            .await
            .unwrap();
    }

    let page1 = store
        .list_messages(conversation.id, bob.id, 1, 2)
        .await
        .unwrap();
    let contents: Vec<_> = page1.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["m4", "m5"]);
    assert!(page1.has_more);

    let page2 = store
        .list_messages(conversation.id, bob.id, 2, 2)
        .await
        .unwrap();
    let contents: Vec<_> = page2.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["m2", "m3"]);
    assert!(page2.has_more);

    let page3 = store
        .list_messages(conversation.id, bob.id, 3, 2)
        .await
        .unwrap();
    let contents: Vec<_> = page3.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["m1"]);
    assert!(!page3.has_more);
}

#[tokio::test]
async fn conversation_list_is_ordered_by_recency_with_unread_counts() {
    let pool = test_pool().await;
    let store = ChatStore::new(pool.clone());
    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;
    let carol = seed_user(&pool, "carol").await;

    let with_bob = store
        .get_or_create_conversation(alice.id, bob.id)
        .await
        .unwrap();
    let with_carol = store
        .get_or_create_conversation(alice.id, carol.id)
        .await
        .unwrap();

    store
        .append_message(with_bob.id, bob.id, "from bob")
        .await
        .unwrap();
    store
        .append_message(with_carol.id, carol.id, "from carol")
        .await
        .unwrap();

    let chats = store.list_conversations(alice.id).await.unwrap();
    assert_eq!(chats.len(), 2);

    // Carol's message landed last, so that conversation leads.
    assert_eq!(chats[0].id, with_carol.id);
    assert_eq!(chats[0].participant.username, "carol");
    assert_eq!(chats[0].unread_count, 1);
    assert_eq!(
        chats[0].last_message.as_ref().unwrap().content,
        "from carol"
    );

    assert_eq!(chats[1].id, with_bob.id);
    assert_eq!(chats[1].unread_count, 1);

    store.mark_conversation_read(with_bob.id, alice.id).await.unwrap();
    let chats = store.list_conversations(alice.id).await.unwrap();
    assert_eq!(chats[1].unread_count, 0);
}
