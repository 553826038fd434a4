//! PGN text in the shape the monthly archive serves

/// One game with archive-style tags and the given movetext
pub fn game_pgn(id: u64, movetext: &str) -> String {
    format!(
        "[Event \"Live Chess\"]\n\
         [Site \"Chess.com\"]\n\
         [Date \"2024.01.05\"]\n\
         [White \"alice\"]\n\
         [Black \"bob\"]\n\
         [Result \"*\"]\n\
         [WhiteElo \"1500\"]\n\
         [BlackElo \"1480\"]\n\
         [TimeControl \"600\"]\n\
         [EndDate \"2024.01.05\"]\n\
         [EndTime \"10:12:00\"]\n\
         [Link \"https://www.chess.com/game/live/{}\"]\n\
         \n\
         {}\n\n",
        id, movetext
    )
}

/// Blob of `count` six-ply games with ids `first_id..first_id + count`
pub fn month_blob(first_id: u64, count: u64) -> Vec<u8> {
    (first_id..first_id + count)
        .map(|id| game_pgn(id, "1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 *"))
        .collect::<String>()
        .into_bytes()
}
