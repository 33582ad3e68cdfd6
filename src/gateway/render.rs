//! 渲染层
//!
//! 把导航 / 检索 / 订单结果翻成渠道无关的 Render（HTML 文本 + 可选图片 +
//! 按钮行）。所有用户可见文案都是乌兹别克语，与商城既有话术保持一致；
//! 动态内容一律转义，标题里的尖括号不会弄坏 HTML。

use crate::catalog::{format_price, status_emoji, status_label, stock_status};
use crate::catalog::{Category, Order, OrderItem, Page, Product};
use crate::config::ShopSection;
use crate::gateway::error::{GatewayError, Missing};
use crate::gateway::intent::{
    cb_category, cb_order_items, cb_page, cb_product, PageDir, CB_BACK, CB_CATEGORIES, CB_CONTACT,
    CB_HELP, CB_MAIN_MENU, CB_ORDER, CB_SEARCH,
};

pub const BTN_PREV: &str = "⬅️ Oldingi";
pub const BTN_NEXT: &str = "Keyingi ➡️";
pub const BTN_BACK: &str = "⬅️ Orqaga";
pub const BTN_HOME: &str = "🏠 Bosh menyu";
pub const BTN_CANCEL: &str = "❌ Bekor qilish";

/// 路径被截断时附在响应最前面的一次性提示
pub const STALE_NAV_NOTICE: &str = "⚠️ Katalog yangilangan, mavjud bo'limga qaytdik.";

/// 商品卡片描述截断长度（字符）
const DESC_LIMIT: usize = 200;

/// 按钮上商品标题的截断长度（字符）
const BTN_TITLE_LIMIT: usize = 25;

/// 渠道无关的响应
#[derive(Debug, Clone, PartialEq)]
pub struct Render {
    /// HTML 文本
    pub text: String,
    /// 可选图片地址（渠道端发图 + caption）
    pub image: Option<String>,
    /// 按钮行
    pub buttons: Vec<Vec<Button>>,
}

impl Render {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(mut self, buttons: Vec<Vec<Button>>) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image;
        self
    }
}

/// 单个按钮
#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

/// 按钮动作：回调进网关，或直接跳链接
#[derive(Debug, Clone, PartialEq)]
pub enum ButtonAction {
    Callback(String),
    Url(String),
}

impl Button {
    pub fn cb(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

/// 分页列表的来源说明（标题行用）
#[derive(Debug, Clone, Copy)]
pub enum PageContext<'a> {
    Search { query: &'a str },
    Category { title: &'a str },
}

/// 渲染器：持有店铺资料与商城站点地址
pub struct Renderer {
    shop: ShopSection,
    base_url: Option<String>,
}

impl Renderer {
    pub fn new(shop: ShopSection, base_url: Option<String>) -> Self {
        Self {
            shop,
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    /// /start 欢迎语
    pub fn welcome(&self, name: Option<&str>) -> Render {
        let name = name.unwrap_or("mehmon");
        let text = format!(
            "Assalomu alaykum, <b>{}</b>! 👋\n\n\
             <b>{}</b> botiga xush kelibsiz!\n\n\
             🤖 Men sizga mahsulotlarni topishda, narxlarni bilishda va buyurtmalar holati haqida ma'lumot berishda yordam beraman.\n\n\
             <b>Nima qila olaman:</b>\n\
             • 🔍 Mahsulotlarni qidirish\n\
             • 📁 Kategoriyalar bo'yicha ko'rish\n\
             • 📦 Buyurtma holatini tekshirish\n\
             • 💬 Savollaringizga javob berish\n\n\
             Pastdagi menyudan foydalaning yoki menga to'g'ridan-to'g'ri yozing! 👇",
            esc(name),
            esc(&self.shop.name)
        );
        Render::text(text).with_buttons(self.menu_buttons())
    }

    /// 主菜单
    pub fn main_menu(&self) -> Render {
        let text = format!(
            "<b>{}</b> 🛒\n\nXush kelibsiz!\n\nQuyidagi menyudan tanlang yoki menga to'g'ridan-to'g'ri yozing:",
            esc(&self.shop.name)
        );
        Render::text(text).with_buttons(self.menu_buttons())
    }

    fn menu_buttons(&self) -> Vec<Vec<Button>> {
        let mut rows = Vec::new();
        if let Some(base) = &self.base_url {
            rows.push(vec![Button::url("🛒 Do'kon (Sayt)", base.clone())]);
        }
        rows.push(vec![
            Button::cb("🔍 Qidirish", CB_SEARCH),
            Button::cb("📂 Kategoriyalar", CB_CATEGORIES),
        ]);
        rows.push(vec![
            Button::cb("📦 Buyurtmalarim", CB_ORDER),
            Button::cb("📞 Aloqa", CB_CONTACT),
        ]);
        rows.push(vec![Button::cb("ℹ️ Yordam", CB_HELP)]);
        if let Some(channel) = &self.shop.channel_url {
            rows.push(vec![Button::url("📢 Kanalimiz", channel.clone())]);
        }
        rows
    }

    /// 类目层：子类目列表
    pub fn categories(&self, category: Option<&Category>, children: &[Category], stale: bool) -> Render {
        let header = match category {
            Some(c) => format!("📂 <b>{}</b>", esc(&c.title)),
            None => "📂 <b>Kategoriyalar</b>".to_string(),
        };
        let text = with_notice(header, stale);

        let mut rows: Vec<Vec<Button>> = children
            .iter()
            .map(|c| vec![Button::cb(format!("📁 {}", c.title), cb_category(c.id))])
            .collect();
        rows.push(vec![
            Button::cb(BTN_BACK, CB_BACK),
            Button::cb(BTN_HOME, CB_MAIN_MENU),
        ]);
        Render::text(text).with_buttons(rows)
    }

    /// 商品分页列表
    pub fn products_page(
        &self,
        context: PageContext<'_>,
        page: &Page<Product>,
        token: &str,
        stale: bool,
    ) -> Render {
        if page.is_empty() {
            let text = match context {
                PageContext::Search { query } => format!(
                    "🔍 <b>\"{}\"</b> bo'yicha hech narsa topilmadi.",
                    esc(query)
                ),
                PageContext::Category { .. } => {
                    "Bu kategoriyada hozircha mahsulotlar yo'q.".to_string()
                }
            };
            return Render::text(with_notice(text, stale)).with_buttons(vec![vec![
                Button::cb(BTN_BACK, CB_BACK),
                Button::cb(BTN_HOME, CB_MAIN_MENU),
            ]]);
        }

        let header = match context {
            PageContext::Search { query } => format!(
                "🔍 <b>\"{}\"</b> bo'yicha natijalar (Sahifa {}/{}):",
                esc(query),
                page.index + 1,
                page.total_pages
            ),
            PageContext::Category { title } => format!(
                "📦 <b>{}</b> - Mahsulotlar (Sahifa {}/{}):",
                esc(title),
                page.index + 1,
                page.total_pages
            ),
        };

        let mut text = with_notice(header, stale);
        text.push_str("\n\n");
        for (i, p) in page.items.iter().enumerate() {
            let stock_emoji = if p.stock == 0 { "❌" } else { "✅" };
            text.push_str(&format!(
                "{}. <b>{}</b>\n   💰 {} so'm | {}\n\n",
                i + 1,
                esc(&p.title),
                format_price(p.price),
                stock_emoji
            ));
        }

        let mut rows = Vec::new();
        for pair in page.items.chunks(2) {
            rows.push(
                pair.iter()
                    .map(|p| {
                        Button::cb(format!("📦 {}", truncate(&p.title, BTN_TITLE_LIMIT)), cb_product(p.id))
                    })
                    .collect(),
            );
        }
        let mut nav = Vec::new();
        if page.has_prev {
            nav.push(Button::cb(BTN_PREV, cb_page(PageDir::Prev, token)));
        }
        if page.has_next {
            nav.push(Button::cb(BTN_NEXT, cb_page(PageDir::Next, token)));
        }
        if !nav.is_empty() {
            rows.push(nav);
        }
        rows.push(vec![Button::cb(BTN_HOME, CB_MAIN_MENU)]);

        Render::text(text.trim_end().to_string()).with_buttons(rows)
    }

    /// 商品卡片
    pub fn product_card(&self, product: &Product, breadcrumbs: &str) -> Render {
        let mut text = format!(
            "🏷 <b>{}</b>\n\n💰 Narxi: <b>{} so'm</b>\n",
            esc(&product.title),
            format_price(product.price)
        );
        if let Some(old) = product.old_price {
            if product.has_discount() {
                text.push_str(&format!(
                    "🏷 Eski narx: <s>{} so'm</s>\n",
                    format_price(old)
                ));
            }
        }
        text.push_str(&format!("📦 Holati: {}\n", stock_status(product.stock)));
        text.push_str(&format!("📁 Kategoriya: {}\n", esc(breadcrumbs)));
        if !product.description.is_empty() {
            let desc = truncate(&product.description, DESC_LIMIT);
            text.push_str(&format!("\n📝 {}", esc(&desc)));
        }

        let mut rows = Vec::new();
        if let Some(url) = self.product_url(product) {
            rows.push(vec![Button::url("🛒 Sotib olish (Saytda) 🌐", url)]);
        }
        rows.push(vec![
            Button::cb(BTN_BACK, CB_BACK),
            Button::cb(BTN_HOME, CB_MAIN_MENU),
        ]);

        Render::text(text.trim_end().to_string())
            .with_image(self.image_url(product))
            .with_buttons(rows)
    }

    /// 商城图片地址：/uploads/product/{id 整除 1000 补零到 3 位}/{id}/{文件名}
    pub fn image_url(&self, product: &Product) -> Option<String> {
        let image = product.image.as_deref()?;
        if image.is_empty() {
            return None;
        }
        if image.starts_with("http") {
            return Some(image.to_string());
        }
        let base = self.base_url.as_deref()?;
        Some(format!(
            "{}/uploads/product/{:03}/{}/{}",
            base,
            product.id / 1000,
            product.id,
            image
        ))
    }

    /// 商城商品页地址
    pub fn product_url(&self, product: &Product) -> Option<String> {
        let base = self.base_url.as_deref()?;
        if product.slug.is_empty() {
            return None;
        }
        if product.slug.starts_with("http") {
            return Some(product.slug.clone());
        }
        Some(format!("{}/{}", base, product.slug.trim_start_matches('/')))
    }

    /// 搜索词输入提示
    pub fn search_prompt(&self) -> Render {
        Render::text(
            "🔍 <b>Mahsulot qidirish</b>\n\n\
             Qidirmoqchi bo'lgan mahsulot nomini yozing.\n\n\
             <i>Masalan: ko'ylak, futbolka, ayollar kiyimi</i>",
        )
        .with_buttons(vec![vec![Button::cb(BTN_CANCEL, CB_MAIN_MENU)]])
    }

    /// 订单号 / 电话输入提示
    pub fn order_prompt(&self) -> Render {
        Render::text(
            "📦 <b>Buyurtma holatini tekshirish</b>\n\n\
             Buyurtma raqamingizni yoki telefon raqamingizni yuboring.\n\n\
             <i>Masalan: 12345 yoki +998901234567</i>",
        )
        .with_buttons(vec![vec![Button::cb(BTN_CANCEL, CB_MAIN_MENU)]])
    }

    /// 订单详情卡片
    pub fn order_details(&self, order: &Order) -> Render {
        let created = order
            .created_at
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "—".to_string());
        let text = format!(
            "📦 <b>Buyurtma #{}</b>\n\n\
             {} <b>Holati:</b> {}\n\
             💰 <b>Jami:</b> {} so'm\n\n\
             👤 <b>Xaridor:</b> {}\n\
             📱 <b>Telefon:</b> {}\n\
             📍 <b>Manzil:</b> {}\n\n\
             📅 <b>Yaratilgan:</b> {}",
            order.id,
            status_emoji(order.status),
            status_label(order.status),
            format_price(order.total),
            esc(&order.name),
            esc(&order.phone),
            esc(&order.address),
            created
        );
        Render::text(text).with_buttons(vec![
            vec![Button::cb("📋 Buyurtma tarkibi", cb_order_items(order.id))],
            vec![Button::cb(BTN_HOME, CB_MAIN_MENU)],
        ])
    }

    /// 同一电话下的多笔订单
    pub fn orders_list(&self, query: &str, orders: &[Order]) -> Render {
        let mut text = format!(
            "📱 <b>{}</b> raqami bo'yicha topilgan buyurtmalar:\n\n",
            esc(query)
        );
        for order in orders {
            let created = order
                .created_at
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "—".to_string());
            text.push_str(&format!(
                "📦 <b>#{}</b> - {}\n   💰 {} so'm | 📅 {}\n\n",
                order.id,
                status_label(order.status),
                format_price(order.total),
                created
            ));
        }
        text.push_str("Batafsil ko'rish uchun buyurtma raqamini yuboring.");
        Render::text(text).with_buttons(vec![vec![Button::cb(BTN_HOME, CB_MAIN_MENU)]])
    }

    /// 电话查询一无所获
    pub fn orders_empty(&self, query: &str) -> Render {
        Render::text(format!(
            "❌ <b>{}</b> raqami bo'yicha buyurtmalar topilmadi.\n\n\
             Telefon raqamingizni tekshirib qaytadan urinib ko'ring.",
            esc(query)
        ))
        .with_buttons(vec![vec![Button::cb(BTN_HOME, CB_MAIN_MENU)]])
    }

    /// 订单商品清单
    pub fn order_items(&self, order_id: i64, items: &[OrderItem]) -> Render {
        if items.is_empty() {
            return Render::text("Buyurtma tarkibi topilmadi.")
                .with_buttons(vec![vec![Button::cb(BTN_HOME, CB_MAIN_MENU)]]);
        }
        let mut text = format!("📋 <b>Buyurtma #{} tarkibi:</b>\n\n", order_id);
        let mut total = 0.0;
        for item in items {
            let subtotal = item.subtotal();
            total += subtotal;
            text.push_str(&format!(
                "📦 <b>{}</b>\n   {} x {} = {} so'm\n\n",
                esc(&item.title),
                item.quantity,
                format_price(item.price),
                format_price(subtotal)
            ));
        }
        text.push_str(&format!(
            "─────────────────\n💰 <b>Jami: {} so'm</b>",
            format_price(total)
        ));
        Render::text(text).with_buttons(vec![vec![Button::cb(BTN_HOME, CB_MAIN_MENU)]])
    }

    /// AI 回答：长回答带回主菜单的路
    pub fn answer(&self, text: &str) -> Render {
        let render = Render::text(text.to_string());
        if text.chars().count() > 100 {
            render.with_buttons(vec![vec![Button::cb(BTN_HOME, CB_MAIN_MENU)]])
        } else {
            render
        }
    }

    /// 翻页按钮指向的结果集已被新查询取代
    pub fn stale_results(&self) -> Render {
        Render::text("⚠️ Qidiruv natijalari eskirgan. Qaytadan qidiring.").with_buttons(vec![
            vec![
                Button::cb("🔍 Qidirish", CB_SEARCH),
                Button::cb(BTN_HOME, CB_MAIN_MENU),
            ],
        ])
    }

    /// 帮助页
    pub fn help(&self) -> Render {
        let text = format!(
            "<b>📚 Yordam</b>\n\n\
             <b>Asosiy buyruqlar:</b>\n\
             /start - Botni qayta ishga tushirish\n\
             /search - Mahsulot qidirish\n\
             /order - Buyurtma holatini tekshirish\n\n\
             <b>Qidiruv misollari:</b>\n\
             • \"Ko'ylak\" - oddiy qidiruv\n\
             • \"Samsung televizor\" - brend bo'yicha\n\n\
             <b>Buyurtma tekshirish:</b>\n\
             Buyurtma raqami yoki telefon raqamingizni yuboring.\n\n\
             <b>Muammo bo'lsa:</b>\n\
             Operatorimiz bilan bog'laning: {}",
            esc(&self.shop.phone)
        );
        Render::text(text).with_buttons(vec![vec![Button::cb(BTN_HOME, CB_MAIN_MENU)]])
    }

    /// 联系方式页
    pub fn contact(&self) -> Render {
        let text = format!(
            "<b>📞 Aloqa ma'lumotlari</b>\n\n\
             📱 Telefon: {}\n\
             📍 Manzil: {}\n\
             🚚 Yetkazib berish: {}\n\
             💳 To'lov: {}\n\n\
             🕐 Ish vaqti: {}",
            esc(&self.shop.phone),
            esc(&self.shop.address),
            esc(&self.shop.delivery),
            esc(&self.shop.payment),
            esc(&self.shop.working_hours)
        );
        Render::text(text).with_buttons(vec![vec![Button::cb(BTN_HOME, CB_MAIN_MENU)]])
    }

    /// 错误 → 用户可读话术。内部细节只进日志，不进聊天窗口。
    pub fn error_reply(&self, err: &GatewayError) -> Render {
        let text = match err {
            GatewayError::NotFound(Missing::Order(id)) => format!(
                "❌ Buyurtma <b>#{}</b> topilmadi.\n\nBuyurtma raqamini tekshirib qaytadan urinib ko'ring.",
                id
            ),
            GatewayError::NotFound(Missing::Product(_)) => {
                "❌ Mahsulot topilmadi yoki sotuvdan olingan.".to_string()
            }
            GatewayError::NotFound(Missing::Category(_)) => {
                "❌ Kategoriya topilmadi. Katalog yangilangan bo'lishi mumkin.".to_string()
            }
            GatewayError::Catalog(_) => {
                "⚠️ Baza bilan aloqa vaqtincha uzildi. Iltimos, birozdan so'ng qayta urinib ko'ring."
                    .to_string()
            }
            GatewayError::Ai(_) => crate::ai::FALLBACK_REPLY.to_string(),
        };
        Render::text(text).with_buttons(vec![vec![Button::cb(BTN_HOME, CB_MAIN_MENU)]])
    }
}

/// stale 提示挂在正文最前面
fn with_notice(text: String, stale: bool) -> String {
    if stale {
        format!("{}\n\n{}", STALE_NAV_NOTICE, text)
    } else {
        text
    }
}

/// HTML 最小转义
fn esc(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// 按字符截断，超长加省略号
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max).collect();
    format!("{}...", cut)
}
