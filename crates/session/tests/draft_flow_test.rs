//! Integration test for the full conversational drafting flow: user turn →
//! function call → draft synthesis → creative resolution → publish.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use draftdesk_core::config::AppConfig;
use draftdesk_core::types::{
    AccountDefaults, CreativeAssignment, CreativeDescriptor, CreativeKind, Message,
    WidgetPayload,
};
use draftdesk_publish::client::{AdPlatformClient, CreateCampaignResponse};
use draftdesk_publish::payload::CreateCampaignPayload;
use draftdesk_session::engine::{
    AccountDataProvider, AiReply, CompletionClient, ConversationEngine, FunctionCallPayload,
};
use serde_json::{json, Value};

// ─── Test doubles ───────────────────────────────────────────────────────

struct ScriptedCompletion {
    replies: Mutex<VecDeque<AiReply>>,
}

impl ScriptedCompletion {
    fn new(replies: Vec<AiReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
        })
    }

    fn function_call(name: &str, arguments: Value) -> AiReply {
        AiReply {
            content: None,
            function_call: Some(FunctionCallPayload {
                name: name.to_string(),
                arguments,
            }),
        }
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, _messages: &[Message]) -> Result<AiReply, anyhow::Error> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted reply left"))
    }
}

struct FailingCompletion;

#[async_trait]
impl CompletionClient for FailingCompletion {
    async fn complete(&self, _messages: &[Message]) -> Result<AiReply, anyhow::Error> {
        Err(anyhow::anyhow!("connection refused"))
    }
}

struct StaticData;

#[async_trait]
impl AccountDataProvider for StaticData {
    async fn list_pixels(&self, _account_id: &str) -> Result<Value, anyhow::Error> {
        Ok(json!([{ "id": "pixel_1", "name": "Main pixel" }]))
    }
    async fn list_identities(&self, _account_id: &str) -> Result<Value, anyhow::Error> {
        Ok(json!([{ "page_id": "page_1" }]))
    }
    async fn list_creatives(
        &self,
        _account_id: &str,
    ) -> Result<Vec<CreativeDescriptor>, anyhow::Error> {
        Ok(vec![image("lib-a"), image("lib-b")])
    }
    async fn search_geo(&self, _query: &str) -> Result<Value, anyhow::Error> {
        Ok(json!([]))
    }
    async fn search_interests(&self, _query: &str) -> Result<Value, anyhow::Error> {
        Ok(json!([]))
    }
    async fn list_collections(&self, _account_id: &str) -> Result<Value, anyhow::Error> {
        Ok(json!([]))
    }
}

struct CountingPlatform {
    calls: AtomicUsize,
}

#[async_trait]
impl AdPlatformClient for CountingPlatform {
    async fn create_campaign(
        &self,
        _payload: &CreateCampaignPayload,
    ) -> Result<CreateCampaignResponse, anyhow::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CreateCampaignResponse {
            campaign_id: Some("camp_77".to_string()),
            error: None,
        })
    }
}

// ─── Fixtures ───────────────────────────────────────────────────────────

fn image(id: &str) -> CreativeDescriptor {
    CreativeDescriptor {
        id: id.to_string(),
        hash: format!("hash-{}", id),
        url: String::new(),
        kind: CreativeKind::Image,
        name: id.to_string(),
    }
}

fn defaults() -> AccountDefaults {
    AccountDefaults {
        account_id: "act_1".to_string(),
        page_id: "page_1".to_string(),
        page_name: "Main Page".to_string(),
        pixel_id: "pixel_1".to_string(),
        instagram_actor_id: "ig_1".to_string(),
        domain: "shop.example.com".to_string(),
    }
}

fn sales_proposal(structure: &str) -> Value {
    json!({
        "name": "Spring Launch",
        "objective": "sales",
        "campaign_structure": structure,
        "budget": 120.0,
        "targeting": { "countries": ["BR"] },
        "ad_sets": [{ "name": "Warm audience" }]
    })
}

fn engine(
    completion: Arc<dyn CompletionClient>,
    platform: Arc<CountingPlatform>,
) -> ConversationEngine {
    ConversationEngine::new(
        AppConfig::default(),
        completion,
        Arc::new(StaticData),
        platform,
    )
}

// ─── Scenarios ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_preselected_creatives_auto_publish_without_wizard() {
    let completion = ScriptedCompletion::new(vec![ScriptedCompletion::function_call(
        "propose_campaign_structure",
        sales_proposal("1-3-1"),
    )]);
    let platform = Arc::new(CountingPlatform {
        calls: AtomicUsize::new(0),
    });
    let engine = engine(completion, platform.clone());

    let preselected = vec![image("a"), image("b"), image("c")];
    let messages = engine
        .send_message("conv-1", "create a sales campaign", &defaults(), preselected)
        .await
        .unwrap();

    // Publish fired exactly once, no wizard was shown.
    assert_eq!(platform.calls.load(Ordering::SeqCst), 1);
    assert!(!messages
        .iter()
        .any(|m| matches!(m.widget, Some(WidgetPayload::CreativePicker(_)))));
    assert!(messages.iter().any(|m| matches!(
        m.widget,
        Some(WidgetPayload::CampaignCreated { ref campaign_id, .. }) if campaign_id == "camp_77"
    )));

    let draft = engine.draft("conv-1").unwrap();
    assert_eq!(draft.ad_sets.len(), 3);
    assert!(draft
        .ad_sets
        .iter()
        .all(|s| s.ads.iter().all(|a| a.creative.is_some())));
}

#[tokio::test]
async fn test_wizard_flow_resumes_and_publishes() {
    let completion = ScriptedCompletion::new(vec![ScriptedCompletion::function_call(
        "createCampaignDraft",
        sales_proposal("1-2-1"),
    )]);
    let platform = Arc::new(CountingPlatform {
        calls: AtomicUsize::new(0),
    });
    let engine = engine(completion, platform.clone());

    let messages = engine
        .send_message("conv-1", "create a campaign", &defaults(), Vec::new())
        .await
        .unwrap();

    // Not enough creatives: wizard with exactly two sets of one slot each.
    let wizard = messages
        .iter()
        .find_map(|m| match &m.widget {
            Some(WidgetPayload::CreativePicker(w)) => Some(w.clone()),
            _ => None,
        })
        .expect("wizard should be shown");
    assert_eq!(wizard.ad_sets.len(), 2);
    assert_eq!(wizard.slot_count(), 2);
    assert_eq!(platform.calls.load(Ordering::SeqCst), 0);

    let assignments = vec![
        CreativeAssignment {
            ad_id: "draft-ad-0-0".to_string(),
            ad_set_id: "draft-adset-0".to_string(),
            creative: image("x"),
        },
        CreativeAssignment {
            ad_id: "draft-ad-1-0".to_string(),
            ad_set_id: "draft-adset-1".to_string(),
            creative: image("y"),
        },
    ];
    let messages = engine
        .apply_creative_assignments("conv-1", assignments, &defaults())
        .await
        .unwrap();

    assert_eq!(platform.calls.load(Ordering::SeqCst), 1);
    assert!(messages.iter().any(Message::is_campaign_created));
    assert!(engine.draft("conv-1").is_some());

    // Delivering the same assignments again is a no-op: the guard holds.
    let repeat = engine
        .apply_creative_assignments(
            "conv-1",
            vec![CreativeAssignment {
                ad_id: "draft-ad-0-0".to_string(),
                ad_set_id: "draft-adset-0".to_string(),
                creative: image("z"),
            }],
            &defaults(),
        )
        .await
        .unwrap();
    assert!(repeat.is_empty());
    assert_eq!(platform.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_pixel_blocks_sales_proposal() {
    let completion = ScriptedCompletion::new(vec![ScriptedCompletion::function_call(
        "propose_campaign_structure",
        sales_proposal("1-1-1"),
    )]);
    let platform = Arc::new(CountingPlatform {
        calls: AtomicUsize::new(0),
    });
    let engine = engine(completion, platform.clone());

    let mut no_pixel = defaults();
    no_pixel.pixel_id.clear();

    let messages = engine
        .send_message("conv-1", "create a sales campaign", &no_pixel, Vec::new())
        .await
        .unwrap();

    let missing: Vec<&Message> = messages
        .iter()
        .filter(|m| matches!(m.widget, Some(WidgetPayload::MissingFields { .. })))
        .collect();
    assert_eq!(missing.len(), 1);
    assert!(missing[0].content.contains("pixel"));
    // No wizard, no draft, no publish.
    assert!(!messages
        .iter()
        .any(|m| matches!(m.widget, Some(WidgetPayload::CreativePicker(_)))));
    assert!(engine.draft("conv-1").is_none());
    assert_eq!(platform.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_transport_failure_keeps_session_usable() {
    let platform = Arc::new(CountingPlatform {
        calls: AtomicUsize::new(0),
    });
    let engine = ConversationEngine::new(
        AppConfig::default(),
        Arc::new(FailingCompletion),
        Arc::new(StaticData),
        platform,
    );

    let messages = engine
        .send_message("conv-1", "hello", &defaults(), Vec::new())
        .await
        .unwrap();
    assert!(messages
        .iter()
        .any(|m| m.content.contains("couldn't reach")));

    // The loading flag was released: a second turn is accepted.
    let messages = engine
        .send_message("conv-1", "hello again", &defaults(), Vec::new())
        .await
        .unwrap();
    assert!(!messages.is_empty());
}

#[tokio::test]
async fn test_new_campaign_intent_clears_draft_state() {
    let completion = ScriptedCompletion::new(vec![
        ScriptedCompletion::function_call("propose_campaign_structure", sales_proposal("1-2-1")),
        AiReply {
            content: Some("Sure. What should the new campaign promote?".to_string()),
            function_call: None,
        },
    ]);
    let platform = Arc::new(CountingPlatform {
        calls: AtomicUsize::new(0),
    });
    let engine = engine(completion, platform);

    engine
        .send_message("conv-1", "create a campaign", &defaults(), Vec::new())
        .await
        .unwrap();
    // Wizard is pending now.

    engine
        .send_message("conv-1", "esquece, quero uma nova campanha", &defaults(), Vec::new())
        .await
        .unwrap();

    assert!(engine.draft("conv-1").is_none());
    // A late wizard result no longer resumes anything.
    let resumed = engine
        .apply_creative_assignments(
            "conv-1",
            vec![CreativeAssignment {
                ad_id: "draft-ad-0-0".to_string(),
                ad_set_id: "draft-adset-0".to_string(),
                creative: image("late"),
            }],
            &defaults(),
        )
        .await
        .unwrap();
    assert!(resumed.is_empty());
}

#[tokio::test]
async fn test_creative_listing_resumes_pending_proposal() {
    let completion = ScriptedCompletion::new(vec![
        ScriptedCompletion::function_call("propose_campaign_structure", sales_proposal("1-2-1")),
        ScriptedCompletion::function_call("list_creatives", json!({})),
    ]);
    let platform = Arc::new(CountingPlatform {
        calls: AtomicUsize::new(0),
    });
    let engine = engine(completion, platform.clone());

    engine
        .send_message("conv-1", "create a campaign", &defaults(), Vec::new())
        .await
        .unwrap();
    assert_eq!(platform.calls.load(Ordering::SeqCst), 0);

    // The listing result arrives out-of-band while the proposal is parked:
    // the draft materializes with listing creatives distributed round-robin.
    let messages = engine
        .send_message("conv-1", "use my library creatives", &defaults(), Vec::new())
        .await
        .unwrap();

    assert_eq!(platform.calls.load(Ordering::SeqCst), 1);
    assert!(messages.iter().any(Message::is_campaign_created));
    let draft = engine.draft("conv-1").unwrap();
    assert_eq!(draft.ad_sets.len(), 2);
    assert!(draft
        .ad_sets
        .iter()
        .all(|s| s.ads.iter().all(|a| a.creative.is_some())));
}

struct BlockingCompletion {
    release: tokio::sync::Notify,
}

#[async_trait]
impl CompletionClient for BlockingCompletion {
    async fn complete(&self, _messages: &[Message]) -> Result<AiReply, anyhow::Error> {
        self.release.notified().await;
        Ok(AiReply {
            content: Some("done".to_string()),
            function_call: None,
        })
    }
}

#[tokio::test]
async fn test_overlapping_turn_is_rejected_while_outstanding() {
    let blocking = Arc::new(BlockingCompletion {
        release: tokio::sync::Notify::new(),
    });
    let platform = Arc::new(CountingPlatform {
        calls: AtomicUsize::new(0),
    });
    let engine = Arc::new(ConversationEngine::new(
        AppConfig::default(),
        blocking.clone(),
        Arc::new(StaticData),
        platform,
    ));

    let background = engine.clone();
    let first = tokio::spawn(async move {
        background
            .send_message("conv-1", "first", &defaults(), Vec::new())
            .await
    });
    // Let the first turn take the loading flag.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let second = engine
        .send_message("conv-1", "second", &defaults(), Vec::new())
        .await;
    assert!(matches!(
        second,
        Err(draftdesk_core::DraftError::Busy)
    ));

    blocking.release.notify_one();
    first.await.unwrap().unwrap();

    // With the first turn finished, the conversation accepts input again.
    // (No scripted reply is needed: the blocking client answers once more
    // after another release.)
    blocking.release.notify_one();
    let third = engine
        .send_message("conv-1", "third", &defaults(), Vec::new())
        .await;
    assert!(third.is_ok());
}
