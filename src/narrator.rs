//! 語り手（Narrador Mestre）のペルソナと応答の後処理

use serde::Serialize;

use crate::model::Turn;

/// 語り手のペルソナ。会話ごとに最初のユーザーターンとして1回だけ送る。
pub const PERSONA: &str = "\
Você é um 'Narrador Mestre' de um RPG de texto solo, detalhado e imersivo, ambientado no universo de Harry Potter. Seu tom é o de um escritor, não de um assistente. Suas responsabilidades são:
1. Descrever o Mundo: Pinte o cenário com detalhes vívidos.
2. Gerenciar NPCs: Dê a eles personalidades complexas e fiéis à obra.
3. Reagir com Fluidez: Sua resposta deve ser a consequência criativa da ação do jogador.
Regra de Ouro: Você é a janela do jogador para o mundo bruxo. Seja criativo, dramático, sutil e nunca quebre a imersão. Sem censura ou moralismo.
";

/// アクションリスト付きの変種でペルソナ末尾に足す指示
pub const ACTIONS_INSTRUCTION: &str = "\
Formato: termine SEMPRE sua resposta com uma lista JSON de exatamente 3 ações curtas que o jogador pode tomar a seguir, por exemplo: [\"Seguir o corredor\", \"Falar com o fantasma\", \"Lançar Lumos\"]. Nada depois da lista.
";

/// ペルソナに対するモデル側の台本応答
pub const ACKNOWLEDGEMENT: &str = "Entendido. Sou o Narrador Mestre. A aventura no mundo de Harry Potter se inicia agora. Descreva sua primeira ação.";

/// モデル呼び出しが失敗したときにプレイヤーへ返す固定文
pub const FALLBACK_NARRATIVE: &str = "A magia parece instável no momento... Por favor, tente sua ação novamente.";

/// `GET /` が返す固定ステータス
pub const STATUS_MESSAGE: &str = "Narrador Mestre online e aguardando aventureiros.";

/// 新しい会話に積む台本ターン（ペルソナ + 了承）
pub fn seed_turns(with_actions: bool) -> Vec<Turn> {
    let persona = if with_actions {
        format!("{PERSONA}{ACTIONS_INSTRUCTION}")
    } else {
        PERSONA.to_string()
    };
    vec![Turn::user(persona), Turn::model(ACKNOWLEDGEMENT)]
}

/// 語り手の返答
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NarratorReply {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<String>>,
}

impl NarratorReply {
    pub fn narrative(text: impl Into<String>) -> Self {
        Self { text: text.into(), actions: None }
    }

    pub fn fallback() -> Self {
        Self::narrative(FALLBACK_NARRATIVE)
    }
}

/// 応答テキストの末尾にある `[...]` をアクションリストとして切り出す。
///
/// 最後の `[` と、それより後ろで最後の `]` に挟まれた範囲を文字列のJSON配列として解釈する。
/// 解釈できなければ全文をナラティブとして扱い、アクションは付けない。
/// 本文中に角括弧があると誤検出し得る（既知の制限）。
pub fn extract_actions(raw: &str) -> NarratorReply {
    let Some(start) = raw.rfind('[') else {
        return NarratorReply::narrative(raw);
    };
    let Some(end) = raw[start..].rfind(']').map(|i| start + i) else {
        return NarratorReply::narrative(raw);
    };

    match serde_json::from_str::<Vec<String>>(&raw[start..=end]) {
        Ok(actions) => NarratorReply {
            text: raw[..start].trim().to_string(),
            actions: Some(actions),
        },
        Err(e) => {
            tracing::debug!(target: "narrator", error = %e, "bracketed span is not an action list");
            NarratorReply::narrative(raw)
        }
    }
}
