//! 题块处理管线 - 流程层
//!
//! 题块在抽取元数据之前依次经过一组固定步骤：清理 → 图片本地化 → 附件本地化 → 改写。
//! 每一步都返回 [`StepOutcome`]，由调用方决定继续、跳过这一块还是放弃整页。

use std::collections::HashMap;
use std::path::Path;

use futures::future::join_all;
use tracing::{debug, warn};
use url::Url;

use crate::error::AppError;
use crate::models::{AssetKind, AssetRef};
use crate::parsing::dom::fragment_group;
use crate::parsing::transforms::{
    file_links, image_sources, replace_image_sources, replace_link_targets, replace_show_picture,
    rewrite_task_info, strip_answer_inputs, strip_decorations, strip_mathml, ImageSource,
};
use crate::services::AssetDownloader;

/// 处理中的题块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDraft {
    /// 页内序号（从 0 开始）
    pub block_index: usize,
    pub header_html: String,
    pub body_html: String,
    /// 已本地化的资源
    pub assets: Vec<AssetRef>,
}

impl BlockDraft {
    pub fn new(block_index: usize, header_html: String, body_html: String) -> Self {
        Self {
            block_index,
            header_html,
            body_html,
            assets: Vec::new(),
        }
    }
}

/// 单步结果
#[derive(Debug)]
pub enum StepOutcome {
    /// 继续下一步
    Continue(BlockDraft),
    /// 跳过这一块，页面继续
    Skip(String),
    /// 放弃整页
    Fatal(AppError),
}

/// 步骤执行环境
pub struct StepCtx<'a> {
    /// 相对地址的解析基准（实际抓取的地址）
    pub base_url: &'a str,
    pub downloader: &'a AssetDownloader,
    pub assets_dir: &'a Path,
    /// 写入 HTML 的本地引用前缀
    pub reference_prefix: &'a str,
}

/// 管线步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStep {
    StripMathMl,
    StripDecorations,
    LocalizeImages,
    LocalizeFiles,
    RewriteTaskInfo,
    StripAnswerInputs,
}

impl BlockStep {
    pub fn name(self) -> &'static str {
        match self {
            BlockStep::StripMathMl => "strip_mathml",
            BlockStep::StripDecorations => "strip_decorations",
            BlockStep::LocalizeImages => "localize_images",
            BlockStep::LocalizeFiles => "localize_files",
            BlockStep::RewriteTaskInfo => "rewrite_task_info",
            BlockStep::StripAnswerInputs => "strip_answer_inputs",
        }
    }

    pub async fn apply(self, mut draft: BlockDraft, ctx: &StepCtx<'_>) -> StepOutcome {
        match self {
            BlockStep::StripMathMl => {
                draft.header_html = strip_mathml(&draft.header_html);
                draft.body_html = strip_mathml(&draft.body_html);
                StepOutcome::Continue(draft)
            }
            BlockStep::StripDecorations => {
                draft.header_html = strip_decorations(&draft.header_html);
                draft.body_html = strip_decorations(&draft.body_html);
                StepOutcome::Continue(draft)
            }
            BlockStep::LocalizeImages => match parse_base(ctx.base_url) {
                Ok(base) => {
                    localize_images(&mut draft, &base, ctx).await;
                    StepOutcome::Continue(draft)
                }
                Err(e) => StepOutcome::Fatal(e),
            },
            BlockStep::LocalizeFiles => match parse_base(ctx.base_url) {
                Ok(base) => {
                    localize_files(&mut draft, &base, ctx).await;
                    StepOutcome::Continue(draft)
                }
                Err(e) => StepOutcome::Fatal(e),
            },
            BlockStep::RewriteTaskInfo => {
                draft.header_html = rewrite_task_info(&draft.header_html, draft.block_index);
                draft.body_html = rewrite_task_info(&draft.body_html, draft.block_index);
                StepOutcome::Continue(draft)
            }
            BlockStep::StripAnswerInputs => {
                draft.body_html = strip_answer_inputs(&draft.body_html);
                StepOutcome::Continue(draft)
            }
        }
    }
}

fn parse_base(base_url: &str) -> Result<Url, AppError> {
    Url::parse(base_url)
        .map_err(|e| AppError::Other(format!("无法解析页面地址 {}: {}", base_url, e)))
}

/// 图片逐个下载，同一块内不并发
async fn localize_images(draft: &mut BlockDraft, base: &Url, ctx: &StepCtx<'_>) {
    let mut scripts: HashMap<String, String> = HashMap::new();
    let mut tags: HashMap<String, String> = HashMap::new();

    for source in image_sources(&draft.body_html, ctx.reference_prefix) {
        let url = match base.join(source.raw()) {
            Ok(url) => url,
            Err(e) => {
                warn!("⚠️ 图片地址无法解析 '{}': {}", source.raw(), e);
                continue;
            }
        };

        let Some(asset) = ctx
            .downloader
            .download_asset(
                url.as_str(),
                AssetKind::Image,
                ctx.assets_dir,
                ctx.reference_prefix,
                draft.block_index,
            )
            .await
        else {
            continue;
        };

        match source {
            ImageSource::Script(raw) => scripts.insert(raw, asset.reference.clone()),
            ImageSource::Tag(raw) => tags.insert(raw, asset.reference.clone()),
        };
        draft.assets.push(asset);
    }

    if scripts.is_empty() && tags.is_empty() {
        return;
    }
    let html = replace_show_picture(&draft.body_html, &scripts);
    draft.body_html = replace_image_sources(&html, &tags);
}

/// 附件并发下载（受下载器信号量限制）
async fn localize_files(draft: &mut BlockDraft, base: &Url, ctx: &StepCtx<'_>) {
    let links = file_links(&draft.body_html, ctx.reference_prefix);
    if links.is_empty() {
        return;
    }

    let block_index = draft.block_index;
    let downloads = links.into_iter().filter_map(|link| {
        let url = match base.join(&link.target) {
            Ok(url) => url,
            Err(e) => {
                warn!("⚠️ 附件地址无法解析 '{}': {}", link.target, e);
                return None;
            }
        };
        Some(async move {
            let kind = AssetKind::for_file_link(url.path());
            let asset = ctx
                .downloader
                .download_asset(
                    url.as_str(),
                    kind,
                    ctx.assets_dir,
                    ctx.reference_prefix,
                    block_index,
                )
                .await;
            (link.href, asset)
        })
    });

    let mut targets: HashMap<String, String> = HashMap::new();
    for (href, asset) in join_all(downloads).await {
        if let Some(asset) = asset {
            targets.insert(href, asset.reference.clone());
            draft.assets.push(asset);
        }
    }
    draft.body_html = replace_link_targets(&draft.body_html, &targets);
}

/// 步骤序列
#[derive(Debug, Clone)]
pub struct BlockPipeline {
    steps: Vec<BlockStep>,
}

impl Default for BlockPipeline {
    fn default() -> Self {
        Self::new(vec![
            BlockStep::StripMathMl,
            BlockStep::StripDecorations,
            BlockStep::LocalizeImages,
            BlockStep::LocalizeFiles,
            BlockStep::RewriteTaskInfo,
            BlockStep::StripAnswerInputs,
        ])
    }
}

impl BlockPipeline {
    pub fn new(steps: Vec<BlockStep>) -> Self {
        Self { steps }
    }

    /// 依次执行全部步骤
    ///
    /// 任一步返回 Skip / Fatal 时立即停止；全部完成后题干没有文字则返回 Skip。
    pub async fn run(&self, draft: BlockDraft, ctx: &StepCtx<'_>) -> StepOutcome {
        let mut draft = draft;
        for step in &self.steps {
            let block_index = draft.block_index;
            match step.apply(draft, ctx).await {
                StepOutcome::Continue(next) => draft = next,
                other => {
                    debug!("题块 #{} 在 {} 步骤结束", block_index, step.name());
                    return other;
                }
            }
        }

        if fragment_group(&draft.body_html).text().trim().is_empty() {
            return StepOutcome::Skip(format!("题块 #{} 题干为空", draft.block_index));
        }
        StepOutcome::Continue(draft)
    }
}
