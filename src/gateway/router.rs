//! 渠道路由
//!
//! 入口是标准化事件，出口是 Render。文本先归一化成 Intent，再穷举执行；
//! 渠道差异（长轮询 / webhook、按钮形态）全部留在适配器里。
//!
//! 时序约束：同一用户的事件在 lane 里串行，但 AI 兜底可能跑几秒，
//! 所以检索解析挪到 lane 外执行，投递前按 seq 校验——用户发了新意图，
//! 旧回答直接作废；目录操作本身亚秒级，留在 lane 内天然保序。

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::ai::AiContext;
use crate::catalog::{paginate, CatalogStore};
use crate::config::AppConfig;
use crate::gateway::error::{GatewayError, Missing};
use crate::gateway::intent::{
    parse_callback, recognize_text, ChannelEvent, EventMeta, EventPayload, Intent, PageDir,
    SessionKey,
};
use crate::gateway::navigator::{NavOutcome, NavView, Navigator};
use crate::gateway::render::{PageContext, Render, Renderer};
use crate::gateway::resolver::{Resolution, Resolver};
use crate::gateway::session::{PageOrigin, PendingInput, ResultSet};
use crate::gateway::session_store::SessionStore;

/// 渲染结果的投递口，渠道适配器各自实现
#[async_trait]
pub trait RenderSink: Send + Sync {
    async fn deliver(&self, key: &SessionKey, meta: &EventMeta, render: Render);
}

/// 渠道路由器
pub struct ChannelRouter {
    store: Arc<SessionStore>,
    catalog: Arc<dyn CatalogStore>,
    navigator: Navigator,
    resolver: Arc<Resolver>,
    renderer: Arc<Renderer>,
    sink: Arc<dyn RenderSink>,
    max_turns: usize,
    page_size: usize,
}

impl ChannelRouter {
    pub fn new(
        cfg: &AppConfig,
        catalog: Arc<dyn CatalogStore>,
        resolver: Arc<Resolver>,
        sink: Arc<dyn RenderSink>,
    ) -> Self {
        let navigator = Navigator::new(Arc::clone(&catalog));
        let renderer = Arc::new(Renderer::new(cfg.shop.clone(), cfg.catalog.base_url.clone()));
        Self {
            store: Arc::new(SessionStore::new()),
            catalog,
            navigator,
            resolver,
            renderer,
            sink,
            max_turns: cfg.app.max_context_turns,
            page_size: cfg.catalog.page_size,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// 处理一条渠道事件：归一化 → 登记新意图 → 执行。
    /// 失败不外抛，统一翻成用户可读的错误话术。
    pub async fn handle(&self, event: ChannelEvent) {
        let ChannelEvent { key, payload, meta } = event;

        let intent = match payload {
            EventPayload::Text(text) => {
                // 待输入模式消费一次即清除
                let pending = self.store.update(&key, |s| s.pending.take()).await;
                recognize_text(&text, pending)
            }
            EventPayload::Callback(data) => match parse_callback(&data) {
                Some(intent) => intent,
                None => {
                    tracing::debug!(session = %key, data, "unrecognized callback ignored");
                    return;
                }
            },
        };

        // 任何新事件都作废在途的慢操作；按钮事件同时清掉残留的待输入模式
        let (seq, cancel) = self
            .store
            .update(&key, |s| {
                s.pending = None;
                s.begin_intent()
            })
            .await;
        tracing::debug!(session = %key, seq, intent = ?intent, "intent accepted");

        if let Err(err) = self.apply(&key, &meta, intent, seq, cancel).await {
            tracing::warn!(session = %key, error = %err, "intent failed");
            let render = self.renderer.error_reply(&err);
            self.sink.deliver(&key, &meta, render).await;
        }
    }

    async fn apply(
        &self,
        key: &SessionKey,
        meta: &EventMeta,
        intent: Intent,
        seq: u64,
        cancel: CancellationToken,
    ) -> Result<(), GatewayError> {
        match intent {
            Intent::Start => {
                self.store.update(key, |s| s.reset()).await;
                let render = self.renderer.welcome(meta.display_name.as_deref());
                self.sink.deliver(key, meta, render).await;
            }
            Intent::MainMenu => {
                self.store.update(key, |s| s.category_path.clear()).await;
                self.sink.deliver(key, meta, self.renderer.main_menu()).await;
            }
            Intent::BrowseCategories => {
                self.store.update(key, |s| s.category_path.clear()).await;
                let view = self.navigator.root().await?;
                let render = self
                    .render_outcome(key, NavOutcome { view, stale: false })
                    .await;
                self.sink.deliver(key, meta, render).await;
            }
            Intent::SelectCategory { id } => {
                let mut path = self.store.snapshot(key).await.category_path;
                let outcome = self.navigator.select(&mut path, id).await?;
                self.store.update(key, |s| s.category_path = path).await;
                let render = self.render_outcome(key, outcome).await;
                self.sink.deliver(key, meta, render).await;
            }
            Intent::NavigateBack => {
                let mut path = self.store.snapshot(key).await.category_path;
                let outcome = self.navigator.back(&mut path).await?;
                self.store.update(key, |s| s.category_path = path).await;
                let render = self.render_outcome(key, outcome).await;
                self.sink.deliver(key, meta, render).await;
            }
            Intent::SelectProduct { id } => {
                let product = self
                    .catalog
                    .fetch_product(id)
                    .await?
                    .ok_or(GatewayError::NotFound(Missing::Product(id)))?;
                let crumbs = self
                    .navigator
                    .category_breadcrumbs(product.category_id)
                    .await?;
                let render = self.renderer.product_card(&product, &crumbs);
                self.sink.deliver(key, meta, render).await;
            }
            Intent::Paginate { dir, token } => {
                self.turn_page(key, meta, dir, &token).await?;
            }
            Intent::PromptSearch => {
                self.store
                    .update(key, |s| s.pending = Some(PendingInput::SearchQuery))
                    .await;
                self.sink
                    .deliver(key, meta, self.renderer.search_prompt())
                    .await;
            }
            Intent::PromptOrder => {
                self.store
                    .update(key, |s| s.pending = Some(PendingInput::OrderQuery))
                    .await;
                self.sink
                    .deliver(key, meta, self.renderer.order_prompt())
                    .await;
            }
            Intent::Search { query } => {
                self.spawn_resolution(key.clone(), meta.clone(), query, true, seq, cancel);
            }
            Intent::TextQuery { text } => {
                self.spawn_resolution(key.clone(), meta.clone(), text, false, seq, cancel);
            }
            Intent::LookupOrder { id } => {
                let order = self
                    .catalog
                    .fetch_order(id)
                    .await?
                    .ok_or(GatewayError::NotFound(Missing::Order(id)))?;
                self.sink
                    .deliver(key, meta, self.renderer.order_details(&order))
                    .await;
            }
            Intent::OrdersByPhone { phone } => {
                let orders = self.catalog.orders_by_phone(&phone).await?;
                let render = match orders.as_slice() {
                    [] => self.renderer.orders_empty(&phone),
                    [only] => self.renderer.order_details(only),
                    many => self.renderer.orders_list(&phone, many),
                };
                self.sink.deliver(key, meta, render).await;
            }
            Intent::OrderItems { id } => {
                let order = self
                    .catalog
                    .fetch_order(id)
                    .await?
                    .ok_or(GatewayError::NotFound(Missing::Order(id)))?;
                let items = self.catalog.order_items(order.id).await?;
                self.sink
                    .deliver(key, meta, self.renderer.order_items(order.id, &items))
                    .await;
            }
            Intent::Help => {
                self.sink.deliver(key, meta, self.renderer.help()).await;
            }
            Intent::Contact => {
                self.sink.deliver(key, meta, self.renderer.contact()).await;
            }
        }
        Ok(())
    }

    /// 导航结果 → Render。落到商品列表时登记新结果集供翻页。
    async fn render_outcome(&self, key: &SessionKey, outcome: NavOutcome) -> Render {
        match outcome.view {
            NavView::Children { category, children } => {
                self.renderer
                    .categories(category.as_ref(), &children, outcome.stale)
            }
            NavView::Products { category, products } => {
                let result = ResultSet::new(PageOrigin::Category(category.id));
                let token = result.short_token();
                let page = paginate(&products, self.page_size, 0);
                self.store.update(key, |s| s.result = Some(result)).await;
                self.renderer.products_page(
                    PageContext::Category {
                        title: &category.title,
                    },
                    &page,
                    &token,
                    outcome.stale,
                )
            }
        }
    }

    /// 翻页：令牌对不上就提示过期；对得上则重发原查询，页码夹取后渲染。
    async fn turn_page(
        &self,
        key: &SessionKey,
        meta: &EventMeta,
        dir: PageDir,
        token: &str,
    ) -> Result<(), GatewayError> {
        let result = self.store.snapshot(key).await.result;
        let Some(result) = result.filter(|r| r.matches(token)) else {
            self.sink
                .deliver(key, meta, self.renderer.stale_results())
                .await;
            return Ok(());
        };

        let items = match &result.origin {
            PageOrigin::Search(q) => self.catalog.search_products(q).await?,
            PageOrigin::Category(id) => self.catalog.products_in_category(*id).await?,
        };
        let requested = match dir {
            PageDir::Next => result.page + 1,
            PageDir::Prev => result.page.saturating_sub(1),
        };
        let page = paginate(&items, self.page_size, requested);

        // 记录实际展示的页码（夹取后），结果集令牌保持不变
        self.store
            .update(key, |s| {
                if let Some(r) = s.result.as_mut() {
                    if r.matches(token) {
                        r.page = page.index;
                    }
                }
            })
            .await;

        let render = match &result.origin {
            PageOrigin::Search(q) => {
                self.renderer
                    .products_page(PageContext::Search { query: q }, &page, token, false)
            }
            PageOrigin::Category(id) => {
                let title = self
                    .catalog
                    .fetch_category(*id)
                    .await?
                    .map(|c| c.title)
                    .unwrap_or_else(|| "Katalog".to_string());
                self.renderer.products_page(
                    PageContext::Category { title: &title },
                    &page,
                    token,
                    false,
                )
            }
        };
        self.sink.deliver(key, meta, render).await;
        Ok(())
    }

    /// 检索解析挪到 lane 外。取消令牌随时可掐断；投递前 seq 必须仍是最新，
    /// 否则整个结果（连同会话写入）一并丢弃。
    fn spawn_resolution(
        &self,
        key: SessionKey,
        meta: EventMeta,
        query: String,
        forced: bool,
        seq: u64,
        cancel: CancellationToken,
    ) {
        let store = Arc::clone(&self.store);
        let resolver = Arc::clone(&self.resolver);
        let renderer = Arc::clone(&self.renderer);
        let sink = Arc::clone(&self.sink);
        let navigator = self.navigator.clone();
        let page_size = self.page_size;
        let max_turns = self.max_turns;

        tokio::spawn(async move {
            let snapshot = store.snapshot(&key).await;
            let ctx = AiContext {
                category_path: navigator
                    .breadcrumb_titles(&snapshot.category_path)
                    .await
                    .unwrap_or_default(),
                turns: snapshot.turns,
                catalog_hint: None,
            };

            let work = async {
                if forced {
                    resolver.forced_search(&query, &ctx).await
                } else {
                    resolver.resolve(&query, &ctx).await
                }
            };
            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(session = %key, seq, "resolution cancelled by newer intent");
                    return;
                }
                out = work => out,
            };

            match outcome {
                Ok(Resolution::Products { query, products }) => {
                    let result = ResultSet::new(PageOrigin::Search(query.clone()));
                    let token = result.short_token();
                    let page = paginate(&products, page_size, 0);
                    let current = store
                        .update(&key, |s| {
                            if !s.is_current(seq) {
                                return false;
                            }
                            s.last_query = Some(query.clone());
                            s.result = Some(result);
                            true
                        })
                        .await;
                    if !current {
                        tracing::debug!(session = %key, seq, "stale search result dropped");
                        return;
                    }
                    let render = renderer.products_page(
                        PageContext::Search { query: &query },
                        &page,
                        &token,
                        false,
                    );
                    sink.deliver(&key, &meta, render).await;
                }
                Ok(Resolution::Answer(answer)) => {
                    let current = store
                        .update(&key, |s| {
                            if !s.is_current(seq) {
                                return false;
                            }
                            s.push_turn(query.clone(), answer.clone(), max_turns);
                            true
                        })
                        .await;
                    if !current {
                        tracing::debug!(session = %key, seq, "stale ai answer dropped");
                        return;
                    }
                    sink.deliver(&key, &meta, renderer.answer(&answer)).await;
                }
                Err(err) => {
                    if !store.update(&key, |s| s.is_current(seq)).await {
                        return;
                    }
                    tracing::warn!(session = %key, error = %err, "resolution failed");
                    sink.deliver(&key, &meta, renderer.error_reply(&err)).await;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::ai::{AiError, AiOracle, FallbackAdapter, MockOracle};
    use crate::catalog::{MemoryCatalog, Order, OrderItem, Product};
    use crate::gateway::intent::ChannelKind;
    use crate::gateway::render::ButtonAction;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<Render>>,
    }

    impl RecordingSink {
        fn texts(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|r| r.text.clone()).collect()
        }

        fn last(&self) -> Render {
            self.sent.lock().unwrap().last().cloned().unwrap()
        }

        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RenderSink for RecordingSink {
        async fn deliver(&self, _key: &SessionKey, _meta: &EventMeta, render: Render) {
            self.sent.lock().unwrap().push(render);
        }
    }

    struct SlowOracle;

    #[async_trait]
    impl AiOracle for SlowOracle {
        async fn ask(&self, _: &str, _: &str, _: &AiContext) -> Result<String, AiError> {
            tokio::time::sleep(Duration::from_millis(150)).await;
            Ok("SLOW-ANSWER".to_string())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    fn build_router(
        catalog: Arc<MemoryCatalog>,
        oracle: Arc<dyn AiOracle>,
    ) -> (Arc<ChannelRouter>, Arc<RecordingSink>) {
        let cfg = AppConfig::default();
        let store: Arc<dyn CatalogStore> = catalog;
        let adapter = FallbackAdapter::new(
            oracle,
            Duration::from_secs(5),
            1,
            Duration::from_millis(1),
            3500,
        );
        let resolver = Arc::new(Resolver::new(Arc::clone(&store), adapter, cfg.shop.clone()));
        let sink = Arc::new(RecordingSink::default());
        let router = Arc::new(ChannelRouter::new(
            &cfg,
            store,
            resolver,
            Arc::clone(&sink) as Arc<dyn RenderSink>,
        ));
        (router, sink)
    }

    fn demo_router() -> (Arc<ChannelRouter>, Arc<RecordingSink>, Arc<MemoryCatalog>) {
        let catalog = Arc::new(MemoryCatalog::with_demo_data());
        let (router, sink) = build_router(Arc::clone(&catalog), Arc::new(MockOracle));
        (router, sink, catalog)
    }

    fn key(user: &str) -> SessionKey {
        SessionKey::new(ChannelKind::Telegram, user)
    }

    fn text_event(user: &str, text: &str) -> ChannelEvent {
        ChannelEvent {
            key: key(user),
            payload: EventPayload::Text(text.to_string()),
            meta: EventMeta::default(),
        }
    }

    fn cb_event(user: &str, data: &str) -> ChannelEvent {
        ChannelEvent {
            key: key(user),
            payload: EventPayload::Callback(data.to_string()),
            meta: EventMeta::default(),
        }
    }

    /// 从商品列表 Render 的翻页按钮里抠出结果集令牌
    fn page_token(render: &Render) -> String {
        for row in &render.buttons {
            for b in row {
                if let ButtonAction::Callback(data) = &b.action {
                    if let Some(rest) = data.strip_prefix("pg:n:").or_else(|| data.strip_prefix("pg:p:")) {
                        return rest.to_string();
                    }
                }
            }
        }
        panic!("no page button in render: {:?}", render.buttons);
    }

    /// 等 lane 外的检索任务投递完
    async fn wait_for(sink: &RecordingSink, n: usize) {
        for _ in 0..200 {
            if sink.count() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {} renders, got {}", n, sink.count());
    }

    #[tokio::test]
    async fn test_start_resets_session_and_welcomes() {
        let (router, sink, _) = demo_router();
        router
            .store()
            .update(&key("u1"), |s| s.category_path.push(3))
            .await;

        router.handle(text_event("u1", "/start")).await;

        assert!(sink.last().text.contains("xush kelibsiz"));
        let s = router.store().snapshot(&key("u1")).await;
        assert!(s.category_path.is_empty());
    }

    #[tokio::test]
    async fn test_category_browse_select_and_back() {
        let (router, sink, _) = demo_router();

        router.handle(cb_event("u1", "categories")).await;
        assert!(sink.last().text.contains("Kategoriyalar"));

        router.handle(cb_event("u1", "category:1")).await;
        assert!(sink.last().text.contains("Elektronika"));
        let labels: Vec<String> = sink.last().buttons.concat().iter().map(|b| b.label.clone()).collect();
        assert!(labels.iter().any(|l| l.contains("Telefonlar")));

        router.handle(cb_event("u1", "category:3")).await;
        assert!(sink.last().text.contains("Televizorlar"));
        assert_eq!(
            router.store().snapshot(&key("u1")).await.category_path,
            vec![1, 3]
        );

        router.handle(cb_event("u1", "back")).await;
        assert!(sink.last().text.contains("Elektronika"));
        assert_eq!(
            router.store().snapshot(&key("u1")).await.category_path,
            vec![1]
        );
    }

    #[tokio::test]
    async fn test_product_card_and_missing_product() {
        let (router, sink, _) = demo_router();

        router.handle(cb_event("u1", "product:102")).await;
        let card = sink.last();
        assert!(card.text.contains("Samsung TV 43"));
        assert!(card.text.contains("Elektronika &gt; Televizorlar"));

        router.handle(cb_event("u1", "product:999")).await;
        assert!(sink.last().text.contains("Mahsulot topilmadi"));
    }

    #[tokio::test]
    async fn test_pagination_walks_and_clamps() {
        let (router, sink, catalog) = demo_router();
        for i in 0..5 {
            catalog.insert_product(Product {
                id: 110 + i,
                title: format!("Demo TV {}", i),
                price: 1_000_000.0,
                old_price: None,
                image: None,
                description: String::new(),
                slug: format!("demo-tv-{}", i),
                active: true,
                category_id: Some(3),
                stock: 5,
            });
        }

        // 类目 3 现有 7 个商品 → 2 页
        router.handle(cb_event("u1", "category:3")).await;
        let first = sink.last();
        assert!(first.text.contains("Sahifa 1/2"));
        let token = page_token(&first);

        router.handle(cb_event("u1", &format!("pg:n:{}", token))).await;
        assert!(sink.last().text.contains("Sahifa 2/2"));

        // 最后一页继续往后翻：夹取，不报错
        router.handle(cb_event("u1", &format!("pg:n:{}", token))).await;
        assert!(sink.last().text.contains("Sahifa 2/2"));

        router.handle(cb_event("u1", &format!("pg:p:{}", token))).await;
        assert!(sink.last().text.contains("Sahifa 1/2"));
    }

    #[tokio::test]
    async fn test_unknown_page_token_is_stale() {
        let (router, sink, _) = demo_router();
        router.handle(cb_event("u1", "pg:n:deadbeef")).await;
        assert!(sink.last().text.contains("eskirgan"));
    }

    #[tokio::test]
    async fn test_search_prompt_then_query_lists_products() {
        let (router, sink, _) = demo_router();

        router.handle(cb_event("u1", "search")).await;
        assert!(sink.last().text.contains("Mahsulot qidirish"));

        router.handle(text_event("u1", "artel")).await;
        wait_for(&sink, 2).await;
        let render = sink.last();
        assert!(render.text.contains("natijalar"));
        assert!(render.text.contains("Artel"));
        // 待输入模式已消费
        assert!(router.store().snapshot(&key("u1")).await.pending.is_none());
    }

    #[tokio::test]
    async fn test_free_text_structured_hit_skips_ai() {
        let (router, sink, _) = demo_router();
        router.handle(text_event("u1", "samsung")).await;
        wait_for(&sink, 1).await;
        assert!(sink.last().text.contains("natijalar"));
    }

    #[tokio::test]
    async fn test_greeting_gets_ai_answer() {
        let (router, sink, _) = demo_router();
        router.handle(text_event("u1", "salom")).await;
        wait_for(&sink, 1).await;
        assert!(sink.last().text.contains("Sinov rejimi"));
        // 一轮问答进了历史
        let s = router.store().snapshot(&key("u1")).await;
        assert_eq!(s.turns.len(), 1);
        assert_eq!(s.turns[0].question, "salom");
    }

    #[tokio::test]
    async fn test_order_lookup_missing_is_friendly() {
        let (router, sink, _) = demo_router();

        router.handle(cb_event("u1", "order")).await;
        assert!(sink.last().text.contains("Buyurtma holatini"));

        router.handle(text_event("u1", "99999")).await;
        assert!(sink.last().text.contains("#99999"));
        assert!(sink.last().text.contains("topilmadi"));
    }

    #[tokio::test]
    async fn test_order_by_phone_and_items() {
        let (router, sink, catalog) = demo_router();
        catalog.insert_order(
            Order {
                id: 55,
                name: "Aziz".to_string(),
                phone: "+998901234567".to_string(),
                address: "Toshkent".to_string(),
                status: 1,
                total: 20_000.0,
                created_at: None,
            },
            vec![OrderItem {
                title: "Kabel".to_string(),
                quantity: 2,
                price: 10_000.0,
            }],
        );
        catalog.insert_order(
            Order {
                id: 56,
                name: "Aziz".to_string(),
                phone: "+998901234567".to_string(),
                address: "Toshkent".to_string(),
                status: 3,
                total: 90_000.0,
                created_at: None,
            },
            vec![],
        );

        router.handle(cb_event("u1", "order")).await;
        router.handle(text_event("u1", "+998 90 123 45 67")).await;
        let listing = sink.last();
        assert!(listing.text.contains("#56"));
        assert!(listing.text.contains("#55"));

        router.handle(cb_event("u1", "order_items:55")).await;
        let items = sink.last();
        assert!(items.text.contains("Buyurtma #55 tarkibi"));
        assert!(items.text.contains("2 x 10 000 = 20 000 so'm"));
    }

    #[tokio::test]
    async fn test_single_order_by_phone_shows_details() {
        let (router, sink, catalog) = demo_router();
        catalog.insert_order(
            Order {
                id: 60,
                name: "Malika".to_string(),
                phone: "+998911112233".to_string(),
                address: "Samarqand".to_string(),
                status: 4,
                total: 75_000.0,
                created_at: None,
            },
            vec![],
        );

        // 带 + 的输入按电话处理（纯数字会被当成订单号）
        router.handle(cb_event("u1", "order")).await;
        router.handle(text_event("u1", "+998911112233")).await;
        assert!(sink.last().text.contains("Buyurtma #60"));
        assert!(sink.last().text.contains("Yetkazildi"));
    }

    #[tokio::test]
    async fn test_stale_ai_answer_dropped_after_new_intent() {
        let catalog = Arc::new(MemoryCatalog::with_demo_data());
        let (router, sink) = build_router(Arc::clone(&catalog), Arc::new(SlowOracle));

        // AI 兜底在后台跑着,用户等不及点了主菜单
        router.handle(text_event("u1", "salom")).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        router.handle(cb_event("u1", "main_menu")).await;

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(sink.texts().iter().all(|t| !t.contains("SLOW-ANSWER")));
        // 作废的回答也不进对话历史
        assert!(router.store().snapshot(&key("u1")).await.turns.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_callback_stays_silent() {
        let (router, sink, _) = demo_router();
        router.handle(cb_event("u1", "what:is:this")).await;
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn test_help_and_contact_use_shop_profile() {
        let (router, sink, _) = demo_router();

        router.handle(cb_event("u1", "help")).await;
        assert!(sink.last().text.contains("/search"));

        router.handle(cb_event("u1", "contact")).await;
        assert!(sink.last().text.contains("+998 97 477 12 29"));
    }
}
