pub mod live_chat; // 型付きデータモデル
pub mod youtube; // Data API v3クライアント
