//! AI 兜底适配器
//!
//! 包装任意 AiOracle：整体超时、限流指数退避重试、回答长度截断。
//! 系统提示词在这里拼装（店铺资料 + 类目清单 + 会话位置 + 商品素材），
//! 调用失败一律返回 AiError，由路由层降级为固定话术 FALLBACK_REPLY。

use std::sync::Arc;
use std::time::Duration;

use crate::ai::{AiContext, AiError, AiOracle};
use crate::config::ShopSection;

/// AI 全链路失败时发给用户的固定话术
pub const FALLBACK_REPLY: &str =
    "Kechirasiz, hozirda texnik xatolik yuz berdi. Iltimos, birozdan so'ng qayta urinib ko'ring.";

/// 兜底适配器：持有内层客户端与边界参数
pub struct FallbackAdapter {
    inner: Arc<dyn AiOracle>,
    timeout: Duration,
    max_attempts: u32,
    base_delay: Duration,
    max_answer_chars: usize,
}

impl FallbackAdapter {
    pub fn new(
        inner: Arc<dyn AiOracle>,
        timeout: Duration,
        max_attempts: u32,
        base_delay: Duration,
        max_answer_chars: usize,
    ) -> Self {
        Self {
            inner,
            timeout,
            max_attempts: max_attempts.max(1),
            base_delay,
            max_answer_chars,
        }
    }

    pub fn from_config(inner: Arc<dyn AiOracle>, cfg: &crate::config::AiSection) -> Self {
        Self::new(
            inner,
            Duration::from_secs(cfg.timeout_secs),
            cfg.max_attempts,
            Duration::from_millis(cfg.base_delay_ms),
            cfg.max_answer_chars,
        )
    }

    /// 发起一次受边界保护的问答。超时覆盖整个重试过程，不是单次请求。
    pub async fn answer(
        &self,
        system: &str,
        question: &str,
        ctx: &AiContext,
    ) -> Result<String, AiError> {
        let system = compose_system(system, ctx);
        match tokio::time::timeout(self.timeout, self.run(&system, question, ctx)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    oracle = self.inner.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "ai answer timed out"
                );
                Err(AiError::Timeout)
            }
        }
    }

    async fn run(&self, system: &str, question: &str, ctx: &AiContext) -> Result<String, AiError> {
        let mut delay = self.base_delay;
        let mut attempt = 1u32;
        loop {
            match self.inner.ask(system, question, ctx).await {
                Ok(text) => {
                    let text = text.trim();
                    if text.is_empty() {
                        return Err(AiError::Empty);
                    }
                    tracing::debug!(
                        oracle = self.inner.name(),
                        chars = text.chars().count(),
                        "ai answer ok"
                    );
                    return Ok(truncate_chars(text, self.max_answer_chars));
                }
                Err(AiError::RateLimited) if attempt < self.max_attempts => {
                    tracing::warn!(
                        oracle = self.inner.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "ai rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(oracle = self.inner.name(), error = %e, "ai answer failed");
                    return Err(e);
                }
            }
        }
    }
}

/// 从店铺资料与类目清单拼装基础系统提示词
pub fn build_system_prompt(shop: &ShopSection, categories: &[String]) -> String {
    let category_list = if categories.is_empty() {
        "Ma'lumot yo'q".to_string()
    } else {
        categories
            .iter()
            .map(|c| format!("- {}", c))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Siz \"{name}\" do'konining AI yordamchisisiz.\n\n\
         ## Kompaniya haqida:\n\
         - Tavsif: {description}\n\
         - Yetkazib berish: {delivery}\n\
         - To'lov usullari: {payment}\n\
         - Ish vaqti: {working_hours}\n\
         - Telefon: {phone}\n\
         - Manzil: {address}\n\n\
         ## Mavjud Kategoriyalar:\n{category_list}\n\n\
         ## Muloqot uslubi:\n{tone}\n\n\
         ## Qoidalar:\n\
         1. Har doim O'zbek tilida javob bering\n\
         2. Qisqa va aniq javob bering\n\
         3. Mahsulot so'ralganda, bazadan topilgan ma'lumotlarni ishlating\n\
         4. Narxlarni formatlang (masalan: 150 000 so'm)\n\
         5. Agar mahsulot topilmasa, shunga o'xshash mahsulotlarni tavsiya qiling\n\
         6. Foydalanuvchiga do'stona munosabatda bo'ling\n\
         7. Agar foydalanuvchi \"kategoriyalar\" haqida so'rasa, yuqoridagi ro'yxatdan foydalaning.\n\n\
         ## Imkoniyatlaringiz:\n\
         - Mahsulotlarni qidirish va tavsiya qilish\n\
         - Narxlar haqida ma'lumot berish\n\
         - Buyurtma holatini tekshirish\n\
         - Yetkazib berish va to'lov haqida ma'lumot berish\n",
        name = shop.name,
        description = shop.description,
        delivery = shop.delivery,
        payment = shop.payment,
        working_hours = shop.working_hours,
        phone = shop.phone,
        address = shop.address,
        tone = shop.tone,
    )
}

/// 把会话位置与商品素材追加到系统提示词尾部
fn compose_system(system: &str, ctx: &AiContext) -> String {
    let mut out = system.to_string();
    if !ctx.category_path.is_empty() {
        out.push_str(&format!(
            "\n## Joriy bo'lim:\n{}\n",
            ctx.category_path.join(" / ")
        ));
    }
    if let Some(hint) = &ctx.catalog_hint {
        out.push_str(&format!(
            "\n## Bazadagi tegishli mahsulotlar:\n{}\n\n\
             Foydalanuvchi so'roviga mos ravishda yuqoridagi mahsulotlardan foydalaning.\n",
            hint
        ));
    }
    out
}

/// 按字符截断，避免切在 UTF-8 码点中间
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct SlowOracle;

    #[async_trait]
    impl AiOracle for SlowOracle {
        async fn ask(&self, _: &str, _: &str, _: &AiContext) -> Result<String, AiError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("kech javob".to_string())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    /// 前 fail_times 次限流，之后成功
    struct FlakyOracle {
        calls: AtomicU32,
        fail_times: u32,
    }

    #[async_trait]
    impl AiOracle for FlakyOracle {
        async fn ask(&self, _: &str, _: &str, _: &AiContext) -> Result<String, AiError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                Err(AiError::RateLimited)
            } else {
                Ok("javob tayyor".to_string())
            }
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    struct FixedOracle {
        calls: AtomicU32,
        reply: Result<String, AiError>,
    }

    #[async_trait]
    impl AiOracle for FixedOracle {
        async fn ask(&self, _: &str, _: &str, _: &AiContext) -> Result<String, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn adapter(inner: Arc<dyn AiOracle>) -> FallbackAdapter {
        FallbackAdapter::new(inner, Duration::from_secs(5), 3, Duration::from_millis(1), 3500)
    }

    #[tokio::test]
    async fn test_timeout_bounds_slow_oracle() {
        let a = FallbackAdapter::new(
            Arc::new(SlowOracle),
            Duration::from_millis(50),
            3,
            Duration::from_millis(1),
            3500,
        );
        let started = std::time::Instant::now();
        let result = a.answer("s", "q", &AiContext::default()).await;
        assert!(matches!(result, Err(AiError::Timeout)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_rate_limit_retried_then_ok() {
        let oracle = Arc::new(FlakyOracle { calls: AtomicU32::new(0), fail_times: 2 });
        let a = adapter(oracle.clone());
        let answer = a.answer("s", "q", &AiContext::default()).await.unwrap();
        assert_eq!(answer, "javob tayyor");
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_attempts() {
        let oracle = Arc::new(FlakyOracle { calls: AtomicU32::new(0), fail_times: 99 });
        let a = adapter(oracle.clone());
        let result = a.answer("s", "q", &AiContext::default()).await;
        assert!(matches!(result, Err(AiError::RateLimited)));
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_provider_error_not_retried() {
        let oracle = Arc::new(FixedOracle {
            calls: AtomicU32::new(0),
            reply: Err(AiError::Provider("boom".to_string())),
        });
        let a = adapter(oracle.clone());
        let result = a.answer("s", "q", &AiContext::default()).await;
        assert!(matches!(result, Err(AiError::Provider(_))));
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_long_answer_truncated_on_char_boundary() {
        let oracle = Arc::new(FixedOracle {
            calls: AtomicU32::new(0),
            reply: Ok("ў".repeat(500)),
        });
        let a = FallbackAdapter::new(oracle, Duration::from_secs(5), 1, Duration::from_millis(1), 100);
        let answer = a.answer("s", "q", &AiContext::default()).await.unwrap();
        assert_eq!(answer.chars().count(), 101);
        assert!(answer.ends_with('…'));
    }

    #[tokio::test]
    async fn test_blank_answer_is_empty_error() {
        let oracle = Arc::new(FixedOracle {
            calls: AtomicU32::new(0),
            reply: Ok("   \n".to_string()),
        });
        let a = adapter(oracle);
        assert!(matches!(
            a.answer("s", "q", &AiContext::default()).await,
            Err(AiError::Empty)
        ));
    }

    #[test]
    fn test_system_prompt_carries_shop_and_categories() {
        let shop = ShopSection::default();
        let prompt = build_system_prompt(&shop, &["Elektronika".to_string(), "Telefonlar".to_string()]);
        assert!(prompt.contains(&shop.name));
        assert!(prompt.contains("- Elektronika"));
        assert!(prompt.contains("- Telefonlar"));
        assert!(prompt.contains("O'zbek tilida javob bering"));
    }

    #[test]
    fn test_compose_system_appends_context_sections() {
        let ctx = AiContext {
            category_path: vec!["Elektronika".to_string(), "Televizorlar".to_string()],
            catalog_hint: Some("- ID: 7 | Samsung TV | 4 500 000 so'm | ✅ Mavjud".to_string()),
            ..Default::default()
        };
        let composed = compose_system("BAZA", &ctx);
        assert!(composed.starts_with("BAZA"));
        assert!(composed.contains("Elektronika / Televizorlar"));
        assert!(composed.contains("Samsung TV"));
    }
}
