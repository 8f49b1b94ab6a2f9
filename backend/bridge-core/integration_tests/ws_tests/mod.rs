mod tungstenite_server;
