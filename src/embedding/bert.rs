//! BERT-family backbones loaded from safetensors.
//!
//! `config.json` picks the architecture: `model_type: "xlm-roberta"` (bge-m3,
//! bge-reranker-v2-m3) loads candle's `XLMRobertaModel`, which offsets position ids
//! past the padding index; anything else loads `BertModel`. Weights may sit under
//! `bert.`, `roberta.` or at the root.

use candle::{DType, Device, Result, Tensor};
use candle_core as candle;
use candle_core::IndexOp;
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{self, BertModel};
use candle_transformers::models::xlm_roberta::{self, XLMRobertaModel};
use std::path::Path;
use std::sync::Arc;

const XLM_ROBERTA_MODEL_TYPE: &str = "xlm-roberta";

/// Backbone family named by `config.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Architecture {
    Bert,
    XlmRoberta,
}

impl Architecture {
    pub(crate) fn from_config(config: &serde_json::Value) -> Self {
        match config.get("model_type").and_then(|v| v.as_str()) {
            Some(XLM_ROBERTA_MODEL_TYPE) => Self::XlmRoberta,
            _ => Self::Bert,
        }
    }
}

fn read_config(model_dir: &Path) -> Result<serde_json::Value> {
    let config_content = std::fs::read_to_string(model_dir.join("config.json"))?;
    serde_json::from_str(&config_content)
        .map_err(|e| candle::Error::Msg(format!("Failed to parse config: {}", e)))
}

fn parse_config<T: serde::de::DeserializeOwned>(config: serde_json::Value) -> Result<T> {
    serde_json::from_value(config)
        .map_err(|e| candle::Error::Msg(format!("Failed to parse config: {}", e)))
}

fn var_builder(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let weights_path = model_dir.join("model.safetensors");
    // SAFETY: the weights file is opened read-only and must not change while mapped.
    unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device) }
}

fn weights_root<'a>(vb: &VarBuilder<'a>) -> VarBuilder<'a> {
    if vb.contains_tensor("bert.embeddings.word_embeddings.weight") {
        vb.pp("bert")
    } else if vb.contains_tensor("roberta.embeddings.word_embeddings.weight") {
        vb.pp("roberta")
    } else {
        vb.clone()
    }
}

enum Backbone {
    Bert(BertModel),
    XlmRoberta(XLMRobertaModel),
}

impl Backbone {
    /// Loads the backbone and returns it with its hidden size.
    fn load(model_dir: &Path, vb: &VarBuilder) -> Result<(Self, usize)> {
        let config = read_config(model_dir)?;
        let root = weights_root(vb);
        match Architecture::from_config(&config) {
            Architecture::Bert => {
                let config: bert::Config = parse_config(config)?;
                Ok((
                    Self::Bert(BertModel::load(root, &config)?),
                    config.hidden_size,
                ))
            }
            Architecture::XlmRoberta => {
                let config: xlm_roberta::Config = parse_config(config)?;
                Ok((
                    Self::XlmRoberta(XLMRobertaModel::new(&config, root)?),
                    config.hidden_size,
                ))
            }
        }
    }

    /// Returns the CLS hidden state shaped `[batch, hidden_size]`.
    fn cls_hidden(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: Option<&Tensor>,
    ) -> Result<Tensor> {
        let output = match self {
            Self::Bert(model) => model.forward(input_ids, token_type_ids, attention_mask)?,
            Self::XlmRoberta(model) => {
                let mask = match attention_mask {
                    Some(mask) => mask.clone(),
                    None => input_ids.ones_like()?,
                };
                model.forward(input_ids, &mask, token_type_ids, None, None, None)?
            }
        };
        output.i((.., 0, ..))
    }
}

/// Scoring head on top of the CLS state.
enum ClassifierHead {
    /// BERT layout: `classifier`.
    Linear(Linear),
    /// RoBERTa layout: `classifier.dense` → tanh → `classifier.out_proj`.
    Pooled { dense: Linear, out_proj: Linear },
}

impl ClassifierHead {
    fn load(vb: &VarBuilder, hidden_size: usize) -> Result<Self> {
        let vb = vb.pp("classifier");
        if vb.contains_tensor("out_proj.weight") {
            Ok(Self::Pooled {
                dense: candle_nn::linear(hidden_size, hidden_size, vb.pp("dense"))?,
                out_proj: candle_nn::linear(hidden_size, 1, vb.pp("out_proj"))?,
            })
        } else {
            Ok(Self::Linear(candle_nn::linear(hidden_size, 1, vb)?))
        }
    }

    fn forward(&self, cls: &Tensor) -> Result<Tensor> {
        match self {
            Self::Linear(linear) => linear.forward(cls),
            Self::Pooled { dense, out_proj } => out_proj.forward(&dense.forward(cls)?.tanh()?),
        }
    }
}

struct SequenceClassifier {
    backbone: Backbone,
    head: ClassifierHead,
}

/// Cross-encoder head: one relevance logit per (query, passage) pair.
#[derive(Clone)]
pub struct BertClassifier(Arc<SequenceClassifier>);

impl BertClassifier {
    pub fn load<P: AsRef<Path>>(model_dir: P, device: &Device) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        let vb = var_builder(model_dir, device)?;

        let (backbone, hidden_size) = Backbone::load(model_dir, &vb)?;
        let head = ClassifierHead::load(&vb, hidden_size)?;

        Ok(Self(Arc::new(SequenceClassifier { backbone, head })))
    }

    /// Returns logits shaped `[batch, 1]`.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: Option<&Tensor>,
    ) -> Result<Tensor> {
        let cls = self
            .0
            .backbone
            .cls_hidden(input_ids, token_type_ids, attention_mask)?;
        self.0.head.forward(&cls)
    }
}

/// Dense encoder with CLS pooling.
#[derive(Clone)]
pub struct BertEncoder {
    backbone: Arc<Backbone>,
    hidden_size: usize,
}

impl BertEncoder {
    pub fn load<P: AsRef<Path>>(model_dir: P, device: &Device) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        let vb = var_builder(model_dir, device)?;
        let (backbone, hidden_size) = Backbone::load(model_dir, &vb)?;

        Ok(Self {
            backbone: Arc::new(backbone),
            hidden_size,
        })
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Returns the CLS hidden state shaped `[batch, hidden_size]` (not normalised).
    pub fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: Option<&Tensor>,
    ) -> Result<Tensor> {
        self.backbone
            .cls_hidden(input_ids, token_type_ids, attention_mask)
    }
}
